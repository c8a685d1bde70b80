//! Conversions shared by the TOML and environment config sources.

use super::ConfigError;
use clap::ValueEnum;
use std::str::FromStr;

/// `Duration` stored as whole milliseconds, matching the `*_retry_ms` keys.
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Reads `name`, treating an unset or blank variable as absent.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Overwrites `target` with the parsed value of `name`, if set.
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env_value(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Like [`load_env_var`], for settings that default to unset.
pub fn load_env_opt<T>(name: &str, target: &mut Option<T>) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env_value(name) {
        *target = Some(
            value
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?,
        );
    }
    Ok(())
}

/// Parses a clap value enum case-insensitively, listing the accepted names
/// on error.
pub fn load_env_choice<T: ValueEnum>(name: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Some(value) = env_value(name) {
        *target = T::from_str(&value, true).map_err(|_| {
            let valid: Vec<String> = T::value_variants()
                .iter()
                .filter_map(|variant| variant.to_possible_value())
                .map(|possible| possible.get_name().to_string())
                .collect();
            ConfigError::EnvError(format!(
                "Invalid {name}: {value}. Valid values: {}",
                valid.join(", ")
            ))
        })?;
    }
    Ok(())
}
