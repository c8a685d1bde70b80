use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sink machinery.
///
/// None of these escape `log_message`, `set_file` or `set_level`; they are
/// handled in place and surfaced through the diagnostics channel.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid log level: {0:?} (expected one of Error, Warning, Info, Debug, None)")]
    InvalidLevel(String),

    #[error("Invalid entry kind: {0:?} (expected one of error, warn, info, debug)")]
    InvalidKind(String),

    #[error("Failed to open log file {path}: {source}")]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close log file {path}: {source}")]
    CloseFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to log file {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log sink worker is no longer running")]
    Closed,
}

impl SinkError {
    /// Short, stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::InvalidLevel(_) => "InvalidLevel",
            SinkError::InvalidKind(_) => "InvalidKind",
            SinkError::OpenFailure { .. } => "OpenFailure",
            SinkError::CloseFailure { .. } => "CloseFailure",
            SinkError::WriteFailure { .. } => "WriteFailure",
            SinkError::Closed => "Closed",
        }
    }

    /// Failures the worker retries on its own.
    pub fn is_retried(&self) -> bool {
        matches!(
            self,
            SinkError::OpenFailure { .. } | SinkError::WriteFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        assert_eq!(SinkError::InvalidLevel("x".into()).kind(), "InvalidLevel");
        assert_eq!(SinkError::Closed.kind(), "Closed");

        let err = SinkError::WriteFailure {
            path: PathBuf::from("Log.txt"),
            source: std::io::Error::other("disk gone"),
        };
        assert_eq!(err.kind(), "WriteFailure");
        assert!(err.is_retried());
        assert!(err.to_string().contains("Log.txt"));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_close_failure_is_not_retried() {
        let err = SinkError::CloseFailure {
            path: PathBuf::from("Log.txt"),
            source: std::io::Error::other("busy"),
        };
        assert!(!err.is_retried());
    }
}
