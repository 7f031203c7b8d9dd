//! Per-entity outcomes of partial-success batches.
//!
//! Batch loops never abort on one bad entry. Each entry yields an
//! [`Outcome`]; the loop collects them into a [`BatchReport`] that keeps the
//! successes in input order and remembers why the rest were skipped.

use serde::Serialize;

use crate::call::host_failure;
use crate::error::{AccessResult, ValidationError};
use crate::host::{Handle, HostError};

/// Result of one entry of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The entry was applied.
    Applied {
        /// Checked index of the entity.
        index: u32,
        /// What was read or written.
        value: T,
    },
    /// The entry was skipped.
    Skipped {
        /// Index as supplied by the caller.
        index: i64,
        /// Why it was skipped.
        reason: String,
    },
}

impl<T> Outcome<T> {
    /// Build a skip from any displayable error.
    pub fn skipped(index: i64, reason: impl std::fmt::Display) -> Self {
        Outcome::Skipped {
            index,
            reason: reason.to_string(),
        }
    }

    /// Whether the entry was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// A skipped entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    /// Index as supplied by the caller.
    pub index: i64,
    /// Why it was skipped.
    pub reason: String,
}

/// Collected outcomes of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    /// Successful entries as `(index, value)`, in input order.
    pub applied: Vec<(u32, T)>,
    /// Skipped entries, in input order.
    pub skipped: Vec<Skip>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            applied: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// Record one outcome.
    pub fn push(&mut self, outcome: Outcome<T>) {
        match outcome {
            Outcome::Applied { index, value } => self.applied.push((index, value)),
            Outcome::Skipped { index, reason } => self.skipped.push(Skip { index, reason }),
        }
    }

    /// Whether every entry was applied.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// The applied value for `index`, if any.
    pub fn value(&self, index: u32) -> Option<&T> {
        self.applied.iter().find(|(i, _)| *i == index).map(|(_, v)| v)
    }

    /// Drop the indices and skips, keeping only the applied values.
    pub fn into_values(self) -> Vec<T> {
        self.applied.into_iter().map(|(_, v)| v).collect()
    }
}

impl<T> FromIterator<Outcome<T>> for BatchReport<T> {
    fn from_iter<I: IntoIterator<Item = Outcome<T>>>(iter: I) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}

/// Reject targets that cannot be clamped. Infinities are fine; NaN is not.
pub(crate) fn check_target(target: f64) -> Result<f64, ValidationError> {
    if target.is_nan() {
        return Err(ValidationError::InvalidTarget { target });
    }
    Ok(target)
}

/// Clamp `target` into the handle's `[min, max]` and write it to `value`.
///
/// Returns the value actually written. Host failures are reported under
/// `operation`; a NaN target or an empty range is a [`ValidationError`].
pub(crate) fn clamp_and_set<K: Handle>(
    operation: &str,
    handle: &K,
    target: f64,
) -> AccessResult<f64> {
    let target = check_target(target)?;
    let fail = |err: HostError| host_failure(operation, handle.path(), &err);
    let min = handle.get_f64("min").map_err(fail)?;
    let max = handle.get_f64("max").map_err(fail)?;
    if min.is_nan() || max.is_nan() || min > max {
        return Err(ValidationError::UnusableRange { min, max }.into());
    }
    let applied = target.max(min).min(max);
    handle.set("value", applied.into()).map_err(fail)?;
    Ok(applied)
}
