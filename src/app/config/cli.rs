use super::serde_helpers::{load_env_choice, load_env_opt, load_env_var};
use super::{ConfigError, LogFormat, LogLevel};
use crate::domain::EntryKind;
use crate::writer::{DEFAULT_FILE, DEFAULT_LEVEL, RetryPolicy};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Minimum severity written to the log file (Error, Warning, Info, Debug, None)
    #[arg(long, env = "SINK_LEVEL", default_value = DEFAULT_LEVEL)]
    pub level: String,

    /// Log file to append to
    #[arg(long, env = "SINK_FILE", default_value = DEFAULT_FILE)]
    pub file: PathBuf,

    /// Delay before retrying a failed write, in milliseconds
    #[arg(long, env = "SINK_WRITE_RETRY_MS", default_value = "1000")]
    pub write_retry_ms: u64,

    /// Delay before retrying a failed open, in milliseconds
    #[arg(long, env = "SINK_OPEN_RETRY_MS", default_value = "5000")]
    pub open_retry_ms: u64,

    /// Kind recorded for lines read from standard input
    #[arg(long, env = "SINK_STDIN_KIND", default_value = "info")]
    pub stdin_kind: EntryKind,

    /// Log level of the process's own console output
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Console output format
    #[arg(long, env = "RUST_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "SINK_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived from the retry delays (not a CLI argument)
    #[serde(skip)]
    #[arg(skip)]
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file: PathBuf::from(DEFAULT_FILE),
            write_retry_ms: 1000,
            open_retry_ms: 5000,
            stdin_kind: EntryKind::Info,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(sink_config) = std::env::var("SINK_CONFIG") {
            return Self::from_toml_str(&sink_config);
        }

        let mut config = Config::default();

        load_env_var("SINK_LEVEL", &mut config.level)?;
        load_env_var("SINK_FILE", &mut config.file)?;
        load_env_var("SINK_WRITE_RETRY_MS", &mut config.write_retry_ms)?;
        load_env_var("SINK_OPEN_RETRY_MS", &mut config.open_retry_ms)?;
        load_env_var("SINK_STDIN_KIND", &mut config.stdin_kind)?;
        load_env_opt("SINK_CONFIG_FILE", &mut config.config_file)?;
        load_env_choice("LOG_LEVEL", &mut config.log_level)?;
        load_env_choice("RUST_LOG_FORMAT", &mut config.log_format)?;

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_args_and_env<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        // Start with SINK_CONFIG if available, then override with CLI args
        let base_config = if let Ok(sink_config) = std::env::var("SINK_CONFIG") {
            Self::from_toml_str(&sink_config)?
        } else {
            Config::default()
        };

        // Parse CLI args (which automatically includes env vars due to clap's env feature)
        let mut config = Config::parse_from(args);
        let defaults = Config::default();

        // Merge base_config values for fields that weren't explicitly set via CLI
        if config.level == defaults.level && base_config.level != defaults.level {
            config.level = base_config.level;
        }
        if config.file == defaults.file && base_config.file != defaults.file {
            config.file = base_config.file;
        }
        if config.write_retry_ms == defaults.write_retry_ms
            && base_config.write_retry_ms != defaults.write_retry_ms
        {
            config.write_retry_ms = base_config.write_retry_ms;
        }
        if config.open_retry_ms == defaults.open_retry_ms
            && base_config.open_retry_ms != defaults.open_retry_ms
        {
            config.open_retry_ms = base_config.open_retry_ms;
        }
        if config.stdin_kind == defaults.stdin_kind && base_config.stdin_kind != defaults.stdin_kind
        {
            config.stdin_kind = base_config.stdin_kind;
        }
        if config.log_level == defaults.log_level && base_config.log_level != defaults.log_level {
            config.log_level = base_config.log_level;
        }
        if config.log_format == defaults.log_format && base_config.log_format != defaults.log_format
        {
            config.log_format = base_config.log_format;
        }
        if config.config_file.is_none() && base_config.config_file.is_some() {
            config.config_file = base_config.config_file;
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.retry_policy = RetryPolicy::new(
            Duration::from_millis(self.write_retry_ms),
            Duration::from_millis(self.open_retry_ms),
        );
        Ok(())
    }
}
