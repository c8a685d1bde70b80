use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed retry delays for the write loop.
///
/// There is no attempt cap and no growth: a failing open or write is retried
/// with the same delay until it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(with = "crate::app::config::serde_helpers::millis")]
    pub write_delay: Duration,
    #[serde(with = "crate::app::config::serde_helpers::millis")]
    pub open_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_OPEN_DELAY: Duration = Duration::from_secs(5);

    pub fn new(write_delay: Duration, open_delay: Duration) -> Self {
        Self {
            write_delay,
            open_delay,
        }
    }

    pub fn uniform(delay: Duration) -> Self {
        Self::new(delay, delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WRITE_DELAY, Self::DEFAULT_OPEN_DELAY)
    }
}
