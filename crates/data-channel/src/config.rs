//! Data channel tuning.
//!
//! Usually embedded in the caller's own configuration file:
//!
//! ```toml
//! buffer_size = 65536
//! connect_timeout_secs = 10
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_BUFFER_SIZE;

/// Errors produced while loading a [`TransferConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("buffer_size must be greater than zero")]
    ZeroBufferSize,
}

/// Streaming and dial settings for data connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Chunk size for each read/write on the data connection.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Dial timeout override. When unset, the control connection's
    /// timeout is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            connect_timeout_secs: None,
        }
    }
}

impl TransferConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TransferConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Dial timeout, falling back to the control connection's timeout.
    pub fn connect_timeout(&self, control_timeout: Duration) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(control_timeout)
    }
}
