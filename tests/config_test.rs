use rask_log_sink::app::{Config, ConfigError, LogFormat, LogLevel};
use rask_log_sink::{EntryKind, LogSink};
use serial_test::serial;
use std::io::Write;
use std::{env, path::PathBuf, time::Duration};
use tempfile::NamedTempFile;

fn clean_all_env_vars() {
    let env_vars = [
        "SINK_LEVEL",
        "SINK_FILE",
        "SINK_WRITE_RETRY_MS",
        "SINK_OPEN_RETRY_MS",
        "SINK_STDIN_KIND",
        "SINK_CONFIG",
        "SINK_CONFIG_FILE",
        "LOG_LEVEL",
        "RUST_LOG_FORMAT",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_from_env_reads_sink_variables() {
    clean_all_env_vars();
    unsafe {
        env::set_var("SINK_LEVEL", "Warning");
        env::set_var("SINK_FILE", "/tmp/app/Log.txt");
        env::set_var("SINK_WRITE_RETRY_MS", "250");
        env::set_var("SINK_STDIN_KIND", "error");
        env::set_var("LOG_LEVEL", "DEBUG");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.level, "Warning");
    assert_eq!(config.file, PathBuf::from("/tmp/app/Log.txt"));
    assert_eq!(config.retry_policy.write_delay, Duration::from_millis(250));
    assert_eq!(config.retry_policy.open_delay, Duration::from_secs(5));
    assert_eq!(config.stdin_kind, EntryKind::Error);
    assert_eq!(config.log_level, LogLevel::Debug);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clean_all_env_vars();
    unsafe {
        env::set_var("SINK_OPEN_RETRY_MS", "soon");
    }
    assert!(matches!(Config::from_env(), Err(ConfigError::EnvError(_))));

    clean_all_env_vars();
    unsafe {
        env::set_var("RUST_LOG_FORMAT", "xml");
    }
    assert!(matches!(Config::from_env(), Err(ConfigError::EnvError(_))));

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_sink_config_toml_takes_precedence_over_defaults() {
    clean_all_env_vars();
    unsafe {
        env::set_var(
            "SINK_CONFIG",
            "level = \"Info\"\nfile = \"inline.log\"\nlog_format = \"json\"\nstdin_kind = \"warn\"\nlog_level = \"debug\"",
        );
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.level, "Info");
    assert_eq!(config.file, PathBuf::from("inline.log"));
    assert_eq!(config.log_format, LogFormat::Json);

    let merged = Config::from_args_and_env(["rask-log-sink", "--level", "Debug"]).unwrap();
    assert_eq!(merged.level, "Debug");
    assert_eq!(merged.file, PathBuf::from("inline.log"));
    assert_eq!(merged.log_format, LogFormat::Json);
    assert_eq!(merged.stdin_kind, EntryKind::Warn);
    assert_eq!(merged.log_level, LogLevel::Debug);

    let overridden =
        Config::from_args_and_env(["rask-log-sink", "--stdin-kind", "error"]).unwrap();
    assert_eq!(overridden.stdin_kind, EntryKind::Error);
    assert_eq!(overridden.log_format, LogFormat::Json);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_from_file() {
    clean_all_env_vars();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "level = \"Debug\"\nfile = \"from-file.log\"\nwrite_retry_ms = 100\nstdin_kind = \"warn\""
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.level, "Debug");
    assert_eq!(config.file, PathBuf::from("from-file.log"));
    assert_eq!(config.retry_policy.write_delay, Duration::from_millis(100));
    assert_eq!(config.stdin_kind, EntryKind::Warn);
}

#[test]
#[serial]
fn test_missing_config_file_is_file_error() {
    let result = Config::from_file("/nonexistent/rask-log-sink.toml");
    assert!(matches!(result, Err(ConfigError::FileError(_))));
}

#[tokio::test]
#[serial]
async fn test_sink_from_config_uses_level_and_file() {
    clean_all_env_vars();
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("configured.log");
    let mut config = Config::from_toml_str("level = \"Warning\"\nopen_retry_ms = 50").unwrap();
    config.file = path.clone();

    let sink = LogSink::from_config(&config);
    sink.log_message(EntryKind::Warn, "configured");
    sink.log_message(EntryKind::Info, "filtered");
    sink.shutdown().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[WARN] configured\r\n"
    );
}
