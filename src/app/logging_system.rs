use super::config::{LogFormat, LogLevel};
use crate::capture::SinkLayer;
use parking_lot::RwLock;
use std::str::FromStr;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Invalid log directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("Logging initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Builds the process-wide tracing subscriber.
///
/// The filter starts from the configured level plus per-target directives;
/// `RUST_LOG`, when set, replaces it entirely.
pub struct LoggingSystem {
    directives: RwLock<Vec<Directive>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
        }
    }

    pub fn add_directive(&self, directive: &str) -> Result<(), InitializationError> {
        let parsed =
            Directive::from_str(directive).map_err(|e| InitializationError::InvalidDirective {
                directive: directive.to_string(),
                reason: e.to_string(),
            })?;
        self.directives.write().push(parsed);
        Ok(())
    }

    /// Quiets runtime internals that are noisy at debug level.
    pub fn add_default_directives(&self) -> Result<(), InitializationError> {
        for directive in ["tokio=warn", "runtime=warn", "mio=warn"] {
            self.add_directive(directive)?;
        }
        Ok(())
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        for directive in directives.iter() {
            filter_parts.push(directive.to_string());
        }

        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    /// Builds the subscriber: the console formatter behind the level filter
    /// and, when given, the capture layer feeding the log sink.
    ///
    /// The filter only gates the console. What reaches the log file is
    /// decided by the sink threshold alone.
    pub fn build_subscriber(
        &self,
        default_level: LogLevel,
        format: LogFormat,
        sink_layer: Option<SinkLayer>,
    ) -> Result<impl Subscriber + Send + Sync + 'static, InitializationError> {
        let env_filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::try_from_default_env().map_err(|e| {
                InitializationError::LoggingInitFailed {
                    details: "Failed to parse RUST_LOG".to_string(),
                    source: Box::new(e),
                }
            })?,
            Err(_) => {
                let filter_string = self.build_filter_string(default_level);
                EnvFilter::try_new(&filter_string).map_err(|e| {
                    InitializationError::LoggingInitFailed {
                        details: format!("Failed to create EnvFilter with '{filter_string}'"),
                        source: Box::new(e),
                    }
                })?
            }
        };

        let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
            LogFormat::Json => fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact()
                .boxed(),
        };

        Ok(tracing_subscriber::registry()
            .with(fmt_layer.with_filter(env_filter))
            .with(sink_layer))
    }

    /// Installs the subscriber from [`Self::build_subscriber`] globally.
    pub fn initialize(
        &self,
        default_level: LogLevel,
        format: LogFormat,
        sink_layer: Option<SinkLayer>,
    ) -> Result<(), InitializationError> {
        self.build_subscriber(default_level, format, sink_layer)?
            .try_init()
            .map_err(|e| InitializationError::LoggingInitFailed {
                details: "Failed to set global tracing subscriber".to_string(),
                source: Box::new(e),
            })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs tracing with the default directives.
pub fn init_tracing(
    level: LogLevel,
    format: LogFormat,
    sink_layer: Option<SinkLayer>,
) -> Result<(), InitializationError> {
    let logging_system = LoggingSystem::new();
    logging_system.add_default_directives()?;
    logging_system.initialize(level, format, sink_layer)
}
