//! The process-scoped access context.
//!
//! [`LiveAccess`] owns the host connection, the validator, the snapshot cache
//! and the operation log. Construct one at startup, call
//! [`start`](LiveAccess::start) to begin the cache sweep, and hand references
//! to whoever needs the entity utilities.
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{AccessConfig, LiveAccess, MemoryHost, SetModel, TrackModel};
//!
//! let mut set = SetModel::default();
//! set.tracks.push(TrackModel::midi("Bass"));
//! let access = LiveAccess::new(MemoryHost::new(set), AccessConfig::default());
//! access.start();
//!
//! assert_eq!(access.tracks().find_track_by_name("Bass"), Some(0));
//! access.stop();
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde_json::json;

use crate::batch::Skip;
use crate::cache::{CachePolicy, StateCache};
use crate::clip::Clips;
use crate::clock::{Clock, SystemClock};
use crate::device::Devices;
use crate::host::{Host, HostResult};
use crate::oplog::{DEFAULT_LOG_CAPACITY, OperationLog};
use crate::path::EntityPath;
use crate::snapshot::Snapshot;
use crate::track::Tracks;
use crate::validate::{Validator, VerifyPolicy};

/// Tunables of a [`LiveAccess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessConfig {
    /// Snapshot cache windows.
    pub cache: CachePolicy,
    /// Operation log capacity.
    pub log_capacity: usize,
    /// Behaviour when a live count cannot be read.
    pub verify: VerifyPolicy,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache: CachePolicy::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            verify: VerifyPolicy::default(),
        }
    }
}

/// Shared state through which every host interaction passes.
pub struct LiveAccess<H: Host> {
    pub(crate) host: H,
    pub(crate) validator: Validator,
    pub(crate) cache: StateCache<Snapshot>,
    pub(crate) log: Mutex<OperationLog>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<H: Host> std::fmt::Debug for LiveAccess<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveAccess")
            .field("validator", &self.validator)
            .field("cache", &self.cache)
            .field("log", &*self.log.lock())
            .finish_non_exhaustive()
    }
}

impl<H: Host> LiveAccess<H> {
    /// Create a context on the system clock. The sweep is not started.
    pub fn new(host: H, config: AccessConfig) -> Self {
        Self::with_clock(host, config, Arc::new(SystemClock::new()))
    }

    /// Create a context whose cache ages and call timings read `clock`.
    pub fn with_clock(host: H, config: AccessConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            host,
            validator: Validator::new(config.verify),
            cache: StateCache::with_clock(config.cache, Arc::clone(&clock)),
            log: Mutex::new(OperationLog::with_clock(config.log_capacity, Arc::clone(&clock))),
            clock,
        }
    }

    /// Start the background cache sweep. Returns `false` if already running.
    pub fn start(&self) -> bool {
        self.cache.start()
    }

    /// Stop the background cache sweep. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        self.cache.stop()
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The validator.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The snapshot cache.
    pub fn cache(&self) -> &StateCache<Snapshot> {
        &self.cache
    }

    /// Lock the operation log.
    ///
    /// Do not hold the guard across calls into this context.
    pub fn log(&self) -> MutexGuard<'_, OperationLog> {
        self.log.lock()
    }

    /// Track utilities.
    pub fn tracks(&self) -> Tracks<'_, H> {
        Tracks::new(self)
    }

    /// Device utilities.
    pub fn devices(&self) -> Devices<'_, H> {
        Devices::new(self)
    }

    /// Clip utilities.
    pub fn clips(&self) -> Clips<'_, H> {
        Clips::new(self)
    }

    /// Walk children `start..count`, stopping early on `Break`.
    ///
    /// Children below `start` are never opened. A failure on one child is
    /// logged and skipped. Returns how many children the callback completed on.
    pub(crate) fn iterate_children<F>(
        &self,
        operation: &str,
        start: u32,
        count: usize,
        path_of: impl Fn(u32) -> EntityPath,
        mut callback: F,
    ) -> usize
    where
        F: FnMut(&H::Handle, u32) -> HostResult<ControlFlow<()>>,
    {
        let mut visited = 0;
        for index in start..u32::try_from(count).unwrap_or(u32::MAX) {
            let path = path_of(index);
            match self.call_required(operation, &path, |handle| callback(handle, index)) {
                Ok(flow) => {
                    visited += 1;
                    if flow.is_break() {
                        break;
                    }
                }
                Err(err) => tracing::debug!(operation, index, error = %err, "skipping entity"),
            }
        }
        visited
    }

    /// Send the skipped entries of a batch to the operation log.
    pub(crate) fn record_skips(&self, operation: &str, skipped: &[Skip]) {
        if skipped.is_empty() {
            return;
        }
        let mut log = self.log.lock();
        for skip in skipped {
            log.log_operation(
                operation,
                None,
                json!({ "index": skip.index }),
                None,
                Some(&skip.reason),
            );
        }
    }
}
