//! Domain layer for rask-log-sink.
//!
//! Contains the canonical types shared across all modules:
//! - `Severity`: ordered threshold rank (None/Debug/Info/Warning/Error)
//! - `EntryKind` / `LogEntry`: the immutable value written to the log file
//! - `SinkError`: error taxonomy of the sink machinery

pub mod error;
pub mod log_entry;
pub mod severity;

pub use error::SinkError;
pub use log_entry::{EntryKind, LogEntry};
pub use severity::{Severity, should_log};
