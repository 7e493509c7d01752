//! Engine configuration via `bimstore.toml`
//!
//! Settings are read once when the database is constructed. To change
//! them, edit the file and construct the database again.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use super::transactions::RetryConfig;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "bimstore.toml";

/// Errors loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("config file {path:?}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`EngineConfig`]
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Config could not be rendered as TOML
    #[error("failed to serialize config: {0}")]
    Serialize(String),

    /// A value is out of its allowed range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Retry settings as written in the `[retry]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_retries: retry.max_retries,
            base_delay_ms: retry.base_delay_ms,
            max_delay_ms: retry.max_delay_ms,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new()
            .with_max_retries(settings.max_retries)
            .with_base_delay_ms(settings.base_delay_ms)
            .with_max_delay_ms(settings.max_delay_ms)
    }
}

/// Engine configuration loaded from `bimstore.toml`
///
/// # Example
///
/// ```toml
/// max_batch_changes = 100000
/// strict_references = false
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 10
/// max_delay_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest batch accepted by `commit_changes`
    pub max_batch_changes: usize,
    /// Require reference targets to be live objects
    pub strict_references: bool,
    /// Caller-side retry policy for `commit_with_retry`
    pub retry: RetrySettings,
}

fn default_max_batch_changes() -> usize {
    100_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_changes: default_max_batch_changes(),
            strict_references: false,
            retry: RetrySettings::default(),
        }
    }
}

impl FromStr for EngineConfig {
    type Err = ConfigError;

    /// Parse and validate config text
    fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `max_batch_changes` is zero or the
    /// retry base delay exceeds the maximum delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_changes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_batch_changes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry.base_delay_ms",
                reason: format!(
                    "{} exceeds retry.max_delay_ms {}",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// Retry policy for `commit_with_retry`
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# bimstore engine configuration

# Largest number of changes accepted in one batch.
max_batch_changes = 100000

# Require reference targets to be live objects when they are written.
# When false, only the declared target type is checked.
strict_references = false

# Caller-side retry on lock conflicts (commit_with_retry).
# Delays grow exponentially from base_delay_ms up to max_delay_ms.
[retry]
max_retries = 3
base_delay_ms = 10
max_delay_ms = 100
"#
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to `path`
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
