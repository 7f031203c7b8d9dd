//! Bounded exponential backoff for retryable host failures.
//!
//! Only errors where [`AccessError::is_retryable`] holds are retried;
//! validation and not-found errors return on the first attempt.

use std::time::Duration;

use crate::error::{AccessError, AccessResult};

/// Default number of attempts, the first included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default ceiling on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(2000);

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, at least one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `op`, sleeping between retryable failures.
    pub fn run<T>(&self, op: impl FnMut() -> AccessResult<T>) -> AccessResult<T> {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// Like [`run`](Self::run) with a caller-supplied sleep.
    pub fn run_with_sleep<T>(
        &self,
        mut op: impl FnMut() -> AccessResult<T>,
        mut sleep: impl FnMut(Duration),
    ) -> AccessResult<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && err.is_retryable() => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(attempt, ?delay, error = %err, "retrying");
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(give_up(err, attempt)),
            }
        }
    }
}

fn give_up(err: AccessError, attempts: u32) -> AccessError {
    if attempts > 1 {
        tracing::warn!(attempts, error = %err, "giving up");
    }
    err
}
