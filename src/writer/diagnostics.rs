use crate::domain::SinkError;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Side channel for notices about the sink machinery itself.
///
/// Reports never pass through the queue or the severity filter, so a broken
/// log file cannot feed its own failures back into the write loop.
#[cfg_attr(test, mockall::automock)]
pub trait Diagnostics: Send + Sync {
    fn report(&self, error: &SinkError);
}

/// Writes one line per notice straight to the process's standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn report(&self, error: &SinkError) {
        let mut stderr = std::io::stderr().lock();
        // Nothing sensible is left to do if stderr itself is gone.
        let _ = writeln!(stderr, "[rask-log-sink] {}: {error}", error.kind());
    }
}

/// Keeps every notice in memory, for health endpoints and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    notices: Arc<Mutex<Vec<String>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices recorded so far, formatted as `Kind: message`.
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    /// Number of notices of the given kind (`"WriteFailure"`, ...).
    pub fn count(&self, kind: &str) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|notice| notice.split(':').next() == Some(kind))
            .count()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, error: &SinkError) {
        self.notices
            .lock()
            .push(format!("{}: {error}", error.kind()));
    }
}
