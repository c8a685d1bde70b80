use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Log file path must not be empty".to_string(),
            ));
        }

        // A zero delay would turn a persistent failure into a busy loop.
        if self.write_retry_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Write retry delay must be greater than 0".to_string(),
            ));
        }

        if self.open_retry_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Open retry delay must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
