//! The protected call wrapper.
//!
//! Every host interaction goes through [`LiveAccess::with_handle`] or one of
//! its shorthands. The wrapper opens the handle, checks existence when asked,
//! runs the caller's operation, classifies any failure, times the call and
//! writes one record to the operation log. Whether a failure is returned or
//! swallowed is up to [`CallContext`].

use chrono::Utc;
use serde_json::Value;

use crate::access::LiveAccess;
use crate::error::{AccessError, AccessResult, HostCallError};
use crate::host::{Handle, Host, HostError, HostResult};
use crate::path::EntityPath;

/// Per-call behaviour of [`LiveAccess::safe_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Raise [`AccessError::NotFound`] when the path resolves to nothing.
    pub required: bool,
    /// Return failures (`true`) or swallow them into `Ok(None)` (`false`).
    pub throw_on_error: bool,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            required: false,
            throw_on_error: true,
        }
    }
}

impl CallContext {
    /// Require the target to exist.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Swallow failures.
    pub fn quiet(mut self) -> Self {
        self.throw_on_error = false;
        self
    }
}

impl HostCallError {
    /// Wrap a host failure with call context, stamped now.
    pub fn new(operation: &str, path: &EntityPath, err: &HostError) -> Self {
        Self {
            operation: operation.to_string(),
            path: path.to_string(),
            timestamp: Utc::now(),
            message: err.to_string(),
        }
    }
}

/// Classify a raw host failure.
pub(crate) fn host_failure(operation: &str, path: &EntityPath, err: &HostError) -> AccessError {
    AccessError::HostCall(HostCallError::new(operation, path, err))
}

impl<H: Host> LiveAccess<H> {
    /// Run `op` against the node at `path`, honouring `ctx`.
    ///
    /// Returns `Ok(Some(value))` on success. On failure returns the
    /// classified error, or `Ok(None)` when `ctx.throw_on_error` is off.
    pub fn safe_call<T>(
        &self,
        operation: &str,
        path: &EntityPath,
        ctx: CallContext,
        op: impl FnOnce(&H::Handle) -> HostResult<T>,
    ) -> AccessResult<Option<T>> {
        let outcome = self.with_handle(operation, path, ctx.required, |handle| {
            op(handle).map_err(|err| host_failure(operation, path, &err))
        });
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(err) if ctx.throw_on_error => Err(err),
            Err(_) => Ok(None),
        }
    }

    /// Run `op` at `path`, propagating failures. A missing target is not checked.
    pub fn call<T>(
        &self,
        operation: &str,
        path: &EntityPath,
        op: impl FnOnce(&H::Handle) -> HostResult<T>,
    ) -> AccessResult<T> {
        self.with_handle(operation, path, false, |handle| {
            op(handle).map_err(|err| host_failure(operation, path, &err))
        })
    }

    /// Run `op` at `path`, failing with [`AccessError::NotFound`] if nothing lives there.
    pub fn call_required<T>(
        &self,
        operation: &str,
        path: &EntityPath,
        op: impl FnOnce(&H::Handle) -> HostResult<T>,
    ) -> AccessResult<T> {
        self.with_handle(operation, path, true, |handle| {
            op(handle).map_err(|err| host_failure(operation, path, &err))
        })
    }

    /// The single chokepoint: open, check, run, classify, time and log.
    ///
    /// `op` may return any [`AccessError`], which lets multi-step protocols
    /// report caller errors alongside host failures.
    pub fn with_handle<T>(
        &self,
        operation: &str,
        path: &EntityPath,
        required: bool,
        op: impl FnOnce(&H::Handle) -> AccessResult<T>,
    ) -> AccessResult<T> {
        let started = self.clock.now();

        let outcome = self
            .host
            .open(path)
            .map_err(|err| host_failure(operation, path, &err))
            .and_then(|handle| {
                if required && handle.id() == 0 {
                    Err(AccessError::NotFound {
                        operation: operation.to_string(),
                        path: path.to_string(),
                    })
                } else {
                    op(&handle)
                }
            });

        let elapsed = self.clock.now().saturating_sub(started);
        let path_text = path.to_string();
        let mut log = self.log.lock();
        log.record_duration(operation, elapsed);
        match &outcome {
            Ok(_) => log.log_operation(operation, Some(&path_text), Value::Null, None, None),
            Err(err) => {
                let message = err.to_string();
                log.log_operation(operation, Some(&path_text), Value::Null, None, Some(&message));
            }
        }

        outcome
    }
}
