//! Settings management for the liveset access layer.
//!
//! Loads the cache windows, log capacity, index verification policy and
//! retry backoff from a TOML file and turns them into the types
//! `liveset-core` consumes.
//!
//! # Features
//!
//! - **Settings**: Load and save `settings.toml`, every field optional
//! - **Validation**: Report every invalid field in one error
//! - **Paths**: Platform-specific config directory and saved sets
//!
//! # Example
//!
//! ```rust
//! use liveset_config::Settings;
//!
//! let settings = Settings::from_toml("[cache]\nttl_ms = 250\nmax_age_ms = 2000").unwrap();
//! let config = settings.access_config().unwrap();
//! assert_eq!(config.cache.ttl().as_millis(), 250);
//! ```

mod error;
mod settings;

/// Platform-specific paths for settings and saved sets.
pub mod paths;

/// Settings validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{
    default_settings_path, ensure_user_config_dir, find_set, find_settings, load_or_default,
    user_config_dir, user_sets_dir,
};
pub use settings::{CacheSettings, LogSettings, RetrySettings, Settings, ValidationSettings};
pub use validation::{ValidationError, ValidationResult, validate_settings};
