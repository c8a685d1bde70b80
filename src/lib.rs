#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations in milliseconds stay far below u64::MAX
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SinkError in the writer module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod capture;
pub mod domain;
pub mod filter;
pub mod writer;

// Re-export main types for easy access
pub use app::{App, Config};
pub use capture::SinkLayer;
pub use domain::{EntryKind, LogEntry, Severity, SinkError, should_log};
pub use filter::SeverityFilter;
pub use writer::{LogSink, LogSinkBuilder, QueueSnapshot};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
