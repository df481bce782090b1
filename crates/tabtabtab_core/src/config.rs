//! Host configuration.
//!
//! # Invariants
//! - `HostConfig::default()` always validates.
//! - `log_dir`, when set, is an absolute path.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_NOTIFICATION_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_DEVICE_ID: &str = "local-device";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for a host process embedding the extension runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory; file logging is off when unset.
    pub log_dir: Option<PathBuf>,
    /// Device used when an event payload does not name one.
    pub default_device_id: String,
    pub notification_channel_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            default_device_id: DEFAULT_DEVICE_ID.to_string(),
            notification_channel_capacity: DEFAULT_NOTIFICATION_CHANNEL_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if self.default_device_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_device_id must not be empty".to_string(),
            ));
        }
        if self.notification_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notification_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
