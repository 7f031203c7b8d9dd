//! Settings file format and operations.

use std::path::Path;
use std::time::Duration;

use liveset_core::{AccessConfig, CachePolicy, RetryPolicy, VerifyPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_settings;

/// Access layer settings.
///
/// Every section and field is optional; omitted values take the defaults
/// shown below.
///
/// # TOML Format
///
/// ```toml
/// [cache]
/// ttl_ms = 1000
/// max_age_ms = 5000
/// sweep_interval_ms = 10000
///
/// [log]
/// capacity = 1000
///
/// [validation]
/// verify = "fail-open"
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 100
/// max_delay_ms = 2000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Snapshot cache windows.
    pub cache: CacheSettings,
    /// Operation log.
    pub log: LogSettings,
    /// Index validation.
    pub validation: ValidationSettings,
    /// Retry of transient host failures.
    pub retry: RetrySettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    /// Freshness window in milliseconds.
    pub ttl_ms: u64,
    /// Hard eviction age in milliseconds.
    pub max_age_ms: u64,
    /// Background sweep period in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            ttl_ms: policy.ttl().as_millis() as u64,
            max_age_ms: policy.max_age().as_millis() as u64,
            sweep_interval_ms: policy.sweep_interval().as_millis() as u64,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    /// Records kept before the oldest is dropped.
    pub capacity: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            capacity: AccessConfig::default().log_capacity,
        }
    }
}

/// `[validation]` section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationSettings {
    /// `"fail-open"` or `"fail-closed"`.
    pub verify: VerifyPolicy,
}

/// `[retry]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts in total.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate and convert into the core's [`AccessConfig`].
    pub fn access_config(&self) -> Result<AccessConfig, ConfigError> {
        validate_settings(self)?;
        let cache = CachePolicy::new(
            Duration::from_millis(self.cache.ttl_ms),
            Duration::from_millis(self.cache.max_age_ms),
            Duration::from_millis(self.cache.sweep_interval_ms),
        )
        .map_err(|e| crate::validation::ValidationError::InvalidField {
            field: "cache".to_string(),
            reason: e.to_string(),
        })?;
        Ok(AccessConfig {
            cache,
            log_capacity: self.log.capacity,
            verify: self.validation.verify,
        })
    }

    /// The retry policy described by `[retry]`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }
}
