//! Error taxonomy for the access layer.
//!
//! | Error | Meaning | Retry |
//! |---|---|---|
//! | [`ValidationError`] | caller passed a bad index or note | never |
//! | [`AccessError::NotFound`] | path resolves to no live entity | never |
//! | [`AccessError::HostCall`] | the host call failed | unless the message names a missing entity |

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Index dimension checked by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Tracks of the live set.
    Track,
    /// Devices of a track.
    Device,
    /// Parameters of a device.
    Parameter,
    /// Clip slots of a track.
    ClipSlot,
    /// Scenes of the live set.
    Scene,
}

impl Dimension {
    /// Child list name the host uses for this dimension.
    pub fn child_list(&self) -> &'static str {
        match self {
            Dimension::Track => "tracks",
            Dimension::Device => "devices",
            Dimension::Parameter => "parameters",
            Dimension::ClipSlot => "clip_slots",
            Dimension::Scene => "scenes",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dimension::Track => "track",
            Dimension::Device => "device",
            Dimension::Parameter => "parameter",
            Dimension::ClipSlot => "clip slot",
            Dimension::Scene => "scene",
        })
    }
}

/// Caller error: an index or payload that can never succeed as given.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Negative index.
    #[error("{dimension} index {index} is negative")]
    Negative {
        /// Dimension being checked.
        dimension: Dimension,
        /// The offending index.
        index: i64,
    },

    /// Index not in `[0, count)`.
    #[error("{dimension} index {index} out of range ({})", range_text(*.count))]
    OutOfRange {
        /// Dimension being checked.
        dimension: Dimension,
        /// The offending index.
        index: i64,
        /// Live count reported by the host.
        count: usize,
    },

    /// The live count could not be read and the policy is fail-closed.
    #[error("could not verify {dimension} index {index}: {reason}")]
    Unverified {
        /// Dimension being checked.
        dimension: Dimension,
        /// The index that could not be checked.
        index: i64,
        /// Why the count was unavailable.
        reason: String,
    },

    /// A note field is outside what the host accepts.
    #[error("note {position}: {reason}")]
    InvalidNote {
        /// Position of the note in the batch.
        position: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A write target that is not a number.
    #[error("target {target} is not a number")]
    InvalidTarget {
        /// The rejected target.
        target: f64,
    },

    /// The host reported a range that no value can satisfy.
    #[error("unusable range [{min}, {max}]")]
    UnusableRange {
        /// Reported minimum.
        min: f64,
        /// Reported maximum.
        max: f64,
    },

    /// The number of fed notes differs from the declared count.
    #[error("note batch declared {declared} notes but {fed} were fed")]
    NoteCountMismatch {
        /// Count announced with `notes(N)`.
        declared: usize,
        /// Notes actually sent.
        fed: usize,
    },
}

fn range_text(count: usize) -> String {
    if count == 0 {
        "no entries available".to_string()
    } else {
        format!("valid range 0-{}", count - 1)
    }
}

/// Context attached to a failed host call.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCallError {
    /// Operation name given to the call wrapper.
    pub operation: String,
    /// Path the call targeted.
    pub path: String,
    /// When the failure was caught.
    pub timestamp: DateTime<Utc>,
    /// Message of the underlying failure.
    pub message: String,
}

impl HostCallError {
    /// ISO-8601 rendering of [`timestamp`](Self::timestamp).
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for HostCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed at '{}' ({}): {}",
            self.operation,
            self.path,
            self.iso_timestamp(),
            self.message
        )
    }
}

/// Coarse class of an [`AccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ValidationError`].
    Validation,
    /// See [`AccessError::NotFound`].
    NotFound,
    /// See [`AccessError::HostCall`].
    HostCall,
}

/// Errors surfaced by the access layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccessError {
    /// Bad index or payload.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The path resolves to no live entity.
    #[error("{operation}: no live object at '{path}'")]
    NotFound {
        /// Operation name given to the call wrapper.
        operation: String,
        /// Path that resolved to nothing.
        path: String,
    },

    /// The host raised while serving the call.
    #[error("{0}")]
    HostCall(HostCallError),
}

/// Message fragments that mark a host failure as permanent.
const PERMANENT_MARKERS: [&str; 3] = ["invalid path", "out of range", "does not exist"];

impl AccessError {
    /// Coarse class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::Validation(_) => ErrorKind::Validation,
            AccessError::NotFound { .. } => ErrorKind::NotFound,
            AccessError::HostCall(_) => ErrorKind::HostCall,
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only host call failures are retryable, and not when the host's message
    /// says the entity is missing or the address is invalid.
    pub fn is_retryable(&self) -> bool {
        match self {
            AccessError::HostCall(err) => {
                let message = err.message.to_lowercase();
                !PERMANENT_MARKERS.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }
}

impl AccessError {
    /// Whether the note protocol guard refused the call.
    pub fn is_note_count_mismatch(&self) -> bool {
        matches!(self, AccessError::Validation(ValidationError::NoteCountMismatch { .. }))
    }
}

/// Result type for access layer operations.
pub type AccessResult<T> = Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn host_call(message: &str) -> AccessError {
        AccessError::HostCall(HostCallError {
            operation: "get_track_state".into(),
            path: "live_set tracks 0".into(),
            timestamp: Utc::now(),
            message: message.into(),
        })
    }

    #[test]
    fn out_of_range_cites_valid_range() {
        let err = ValidationError::OutOfRange {
            dimension: Dimension::Track,
            index: 2,
            count: 2,
        };
        assert_eq!(err.to_string(), "track index 2 out of range (valid range 0-1)");
    }

    #[test]
    fn out_of_range_with_empty_dimension() {
        let err = ValidationError::OutOfRange {
            dimension: Dimension::ClipSlot,
            index: 0,
            count: 0,
        };
        assert_eq!(err.to_string(), "clip slot index 0 out of range (no entries available)");
    }

    #[test]
    fn only_transient_host_failures_retry() {
        assert!(host_call("timeout while talking to host").is_retryable());
        assert!(!host_call("Invalid path").is_retryable());
        assert!(!host_call("index OUT OF RANGE").is_retryable());
        assert!(!host_call("object does not exist").is_retryable());

        let validation: AccessError = ValidationError::Negative {
            dimension: Dimension::Scene,
            index: -1,
        }
        .into();
        assert!(!validation.is_retryable());
        assert_eq!(validation.kind(), ErrorKind::Validation);

        let missing = AccessError::NotFound {
            operation: "get_clip_state".into(),
            path: "live_set tracks 0 clip_slots 0 clip".into(),
        };
        assert!(!missing.is_retryable());
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn host_call_display_carries_context() {
        let msg = host_call("boom").to_string();
        assert!(msg.starts_with("get_track_state failed at 'live_set tracks 0'"), "got: {msg}");
        assert!(msg.ends_with(": boom"), "got: {msg}");
    }

    #[test]
    fn iso_timestamp_is_utc_millis() {
        let err = HostCallError {
            operation: "op".into(),
            path: "live_set".into(),
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            message: "m".into(),
        };
        assert_eq!(err.iso_timestamp(), "1970-01-01T00:00:00.000Z");
    }
}
