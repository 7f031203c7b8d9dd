//! Settings validation.
//!
//! Checks every section of a [`Settings`] value and reports all problems at
//! once, so a broken file can be fixed in a single pass.
//!
//! # Example
//!
//! ```rust
//! use liveset_config::{Settings, validate_settings};
//!
//! let mut settings = Settings::default();
//! assert!(validate_settings(&settings).is_ok());
//!
//! settings.cache.ttl_ms = 0;
//! settings.log.capacity = 0;
//! let err = validate_settings(&settings).unwrap_err();
//! assert!(err.to_string().contains("cache.ttl_ms"));
//! ```

use thiserror::Error;

use crate::settings::Settings;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field holds a value the access layer cannot use.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Dotted field name, e.g. `cache.ttl_ms`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check a whole settings value.
///
/// A single problem is returned as-is; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    let mut errors = Vec::new();

    let cache = &settings.cache;
    if cache.ttl_ms == 0 {
        errors.push(ValidationError::invalid("cache.ttl_ms", "must be greater than zero"));
    }
    if cache.max_age_ms <= cache.ttl_ms {
        errors.push(ValidationError::invalid(
            "cache.max_age_ms",
            format!("must be greater than cache.ttl_ms ({})", cache.ttl_ms),
        ));
    }
    if cache.sweep_interval_ms == 0 {
        errors.push(ValidationError::invalid(
            "cache.sweep_interval_ms",
            "must be greater than zero",
        ));
    }

    if settings.log.capacity == 0 {
        errors.push(ValidationError::invalid("log.capacity", "must be at least 1"));
    }

    let retry = &settings.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::invalid("retry.max_attempts", "must be at least 1"));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(ValidationError::invalid(
            "retry.max_delay_ms",
            format!("must not be below retry.base_delay_ms ({})", retry.base_delay_ms),
        ));
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
