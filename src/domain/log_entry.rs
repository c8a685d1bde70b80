use super::error::SinkError;
use super::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind tag carried by every log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Error,
    Warn,
    Info,
    Debug,
}

impl EntryKind {
    /// Rank an entry of this kind must reach to pass the filter.
    pub const fn severity(self) -> Severity {
        match self {
            EntryKind::Error => Severity::Error,
            EntryKind::Warn => Severity::Warning,
            EntryKind::Info => Severity::Info,
            EntryKind::Debug => Severity::Debug,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EntryKind::Error => "error",
            EntryKind::Warn => "warn",
            EntryKind::Info => "info",
            EntryKind::Debug => "debug",
        }
    }

    /// Upper-cased tag used in the on-disk line prefix.
    pub const fn label(self) -> &'static str {
        match self {
            EntryKind::Error => "ERROR",
            EntryKind::Warn => "WARN",
            EntryKind::Info => "INFO",
            EntryKind::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(EntryKind::Error),
            "warn" | "warning" => Ok(EntryKind::Warn),
            "info" | "log" => Ok(EntryKind::Info),
            "debug" => Ok(EntryKind::Debug),
            _ => Err(SinkError::InvalidKind(s.to_string())),
        }
    }
}

impl From<&tracing::Level> for EntryKind {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => EntryKind::Error,
            tracing::Level::WARN => EntryKind::Warn,
            tracing::Level::INFO => EntryKind::Info,
            // DEBUG and TRACE
            _ => EntryKind::Debug,
        }
    }
}

/// A single message accepted by the filter and waiting to be written.
///
/// Entries are immutable once created; the worker only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    kind: EntryKind,
    message: String,
}

impl LogEntry {
    pub fn new(kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the entry as it appears in the log file: `[KIND] message\r\n`.
    pub fn to_line(&self) -> String {
        format!("[{}] {}\r\n", self.kind.label(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let entry = LogEntry::new(EntryKind::Error, "disk full");
        assert_eq!(entry.to_line(), "[ERROR] disk full\r\n");

        let entry = LogEntry::new(EntryKind::Warn, "low memory");
        assert_eq!(entry.to_line(), "[WARN] low memory\r\n");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("error".parse::<EntryKind>().unwrap(), EntryKind::Error);
        assert_eq!("WARN".parse::<EntryKind>().unwrap(), EntryKind::Warn);
        assert_eq!("log".parse::<EntryKind>().unwrap(), EntryKind::Info);
        assert!(matches!(
            "fatal".parse::<EntryKind>(),
            Err(SinkError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_kind_severity_mapping() {
        assert_eq!(EntryKind::Error.severity(), Severity::Error);
        assert_eq!(EntryKind::Warn.severity(), Severity::Warning);
        assert_eq!(EntryKind::Info.severity(), Severity::Info);
        assert_eq!(EntryKind::Debug.severity(), Severity::Debug);
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(EntryKind::from(&tracing::Level::TRACE), EntryKind::Debug);
        assert_eq!(EntryKind::from(&tracing::Level::WARN), EntryKind::Warn);
    }
}
