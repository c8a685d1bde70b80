pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{InitializationError, LoggingSystem, init_tracing};
pub use shutdown::{SHUTDOWN_TIMEOUT, spawn_signal_listener};

use crate::capture::SinkLayer;
use crate::writer::LogSink;
use clap::Parser;
use std::process;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The `rask-log-sink` binary: tees standard input into the log file.
pub struct App {
    config: Config,
    sink: LogSink,
}

impl App {
    pub async fn from_args<I, T>(args: I) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args_and_env(args)?;
        Self::from_config(config).await
    }

    /// Spawns the sink and installs tracing with the capture layer attached.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn from_config(
        config: Config,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let final_config = if let Some(config_file) = &config.config_file {
            eprintln!("Loading configuration from file: {}", config_file.display());
            Config::from_file(config_file)?
        } else {
            config
        };

        let sink = LogSink::from_config(&final_config);
        init_tracing(
            final_config.log_level,
            final_config.log_format,
            Some(SinkLayer::new(sink.clone())),
        )?;

        info!("Starting rask-log-sink v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "Configuration: level={}, file={}, write_retry={:?}, open_retry={:?}",
            final_config.level,
            final_config.file.display(),
            final_config.retry_policy.write_delay,
            final_config.retry_policy.open_delay
        );

        Ok(Self {
            config: final_config,
            sink,
        })
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads standard input until end of input or a shutdown signal.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let token = CancellationToken::new();
        spawn_signal_listener(token.clone());

        info!("rask-log-sink is running. Press Ctrl+C to stop.");
        self.run_with_input(BufReader::new(tokio::io::stdin()), token)
            .await
    }

    /// Records every line of `input` at the configured kind, then drains the
    /// sink within [`SHUTDOWN_TIMEOUT`].
    pub async fn run_with_input<R>(
        self,
        input: R,
        token: CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let kind = self.config.stdin_kind;

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                line = lines.next_line() => match line? {
                    Some(line) => self.sink.emit(kind, &line),
                    None => {
                        info!("End of input reached");
                        break;
                    }
                },
            }
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.sink.shutdown()).await {
            Ok(Ok(())) => info!("rask-log-sink stopped."),
            Ok(Err(e)) => warn!("Log sink already stopped: {}", e),
            Err(_) => {
                error!("Shutdown timeout exceeded, undelivered entries are lost");
            }
        }
        Ok(())
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--version" || args[1] == "-V") {
        println!("rask-log-sink {}", get_version());
        return Ok(());
    }

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        Config::parse_from(["rask-log-sink", "--help"]);
        return Ok(());
    }

    match App::from_args(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    }

    Ok(())
}
