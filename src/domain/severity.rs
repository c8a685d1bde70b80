use super::error::SinkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Threshold rank used by the severity filter.
///
/// Lower ranks are more verbose. `None` is only meaningful as a threshold:
/// no real event carries it, and a `None` threshold accepts nothing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Severity {
    None = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    #[default]
    Error = 4,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::None,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
    ];

    pub const fn rank(self) -> u8 {
        self as u8
    }

    pub const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(Severity::None),
            1 => Some(Severity::Debug),
            2 => Some(Severity::Info),
            3 => Some(Severity::Warning),
            4 => Some(Severity::Error),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SinkError;

    /// Level names are matched case-insensitively; `warn` is accepted as an
    /// alias for `Warning`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(SinkError::InvalidLevel(s.to_string())),
        }
    }
}

/// Returns true when an event of rank `event` passes `threshold`.
#[inline]
pub fn should_log(threshold: Severity, event: Severity) -> bool {
    if threshold == Severity::None || event == Severity::None {
        return false;
    }
    threshold.rank() <= event.rank()
}
