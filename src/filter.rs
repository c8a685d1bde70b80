use crate::domain::{EntryKind, Severity, SinkError, should_log};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Shared, runtime-mutable severity threshold.
///
/// Clones share the same threshold, so every `LogSink` handle sees a level
/// change immediately.
#[derive(Debug, Clone)]
pub struct SeverityFilter {
    threshold: Arc<AtomicU8>,
}

impl SeverityFilter {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold: Arc::new(AtomicU8::new(threshold.rank())),
        }
    }

    pub fn threshold(&self) -> Severity {
        Severity::from_rank(self.threshold.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set_threshold(&self, threshold: Severity) {
        self.threshold.store(threshold.rank(), Ordering::Release);
    }

    /// Parses `name` and installs it as the new threshold.
    ///
    /// On an unknown name the current threshold stays in force.
    pub fn set_level(&self, name: &str) -> Result<Severity, SinkError> {
        let threshold = name.parse::<Severity>()?;
        self.set_threshold(threshold);
        Ok(threshold)
    }

    #[inline]
    pub fn accepts(&self, kind: EntryKind) -> bool {
        should_log(self.threshold(), kind.severity())
    }
}

impl Default for SeverityFilter {
    fn default() -> Self {
        Self::new(Severity::default())
    }
}
