//! Time-boxed read cache with background eviction.
//!
//! [`StateCache`] sits in front of expensive host reads. Two windows govern an
//! entry's life:
//!
//! - **ttl**: an entry younger than `ttl` is *fresh* and served by
//!   [`get`](StateCache::get) without calling the fetcher.
//! - **max_age**: an entry older than `max_age` is removed by the sweep,
//!   whether or not anyone asks for it again.
//!
//! The sweep runs on its own thread between [`start`](StateCache::start) and
//! [`stop`](StateCache::stop), waking every `sweep_interval`. It can also be
//! run by hand with [`sweep`](StateCache::sweep).
//!
//! The cache never learns about host-side changes. Writers must call
//! [`invalidate`](StateCache::invalidate) for the keys they touched.
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{CachePolicy, StateCache};
//!
//! let cache: StateCache<String> = StateCache::new(CachePolicy::default());
//! let name = cache.get("track/0/", || Ok::<_, ()>("Drums".to_string())).unwrap();
//! assert_eq!(name, "Drums");
//! assert!(cache.is_fresh("track/0/"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1000);

/// Default hard eviction window (5x ttl).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(5000);

/// Default sweep period (10x ttl).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(10_000);

/// Rejected cache policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// `ttl` must be non-zero.
    #[error("ttl must be greater than zero")]
    ZeroTtl,
    /// `max_age` must exceed `ttl`.
    #[error("max_age ({max_age:?}) must be greater than ttl ({ttl:?})")]
    MaxAgeNotAboveTtl {
        /// Requested ttl.
        ttl: Duration,
        /// Requested max age.
        max_age: Duration,
    },
    /// The sweep period must be non-zero.
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}

/// Freshness and eviction windows of a [`StateCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    ttl: Duration,
    max_age: Duration,
    sweep_interval: Duration,
}

impl CachePolicy {
    /// Build a policy, enforcing `max_age > ttl > 0` and a non-zero sweep period.
    pub fn new(
        ttl: Duration,
        max_age: Duration,
        sweep_interval: Duration,
    ) -> Result<Self, PolicyError> {
        if ttl.is_zero() {
            return Err(PolicyError::ZeroTtl);
        }
        if max_age <= ttl {
            return Err(PolicyError::MaxAgeNotAboveTtl { ttl, max_age });
        }
        if sweep_interval.is_zero() {
            return Err(PolicyError::ZeroSweepInterval);
        }
        Ok(Self {
            ttl,
            max_age,
            sweep_interval,
        })
    }

    /// Freshness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Hard eviction window.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_age: DEFAULT_MAX_AGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// A memoized value and when it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Duration,
}

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry.
    pub hits: u64,
    /// Reads that invoked the fetcher.
    pub misses: u64,
    /// Entries removed by the sweep.
    pub evictions: u64,
    /// Entries currently stored.
    pub entries: usize,
}

#[derive(Debug)]
struct Store<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

impl<V> Store<V> {
    fn sweep(&mut self, now: Duration, max_age: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.stored_at) <= max_age);
        let evicted = before - self.entries.len();
        self.stats.evictions += evicted as u64;
        evicted
    }
}

struct Sweeper {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

/// Keyed TTL cache with a background sweep.
pub struct StateCache<V> {
    store: Arc<Mutex<Store<V>>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<V> std::fmt::Debug for StateCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("policy", &self.policy)
            .field("entries", &self.store.lock().entries.len())
            .field("running", &self.sweeper.lock().is_some())
            .finish()
    }
}

impl<V: Clone + Send + 'static> StateCache<V> {
    /// Create a cache on the system clock.
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock::new()))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            })),
            policy,
            clock,
            sweeper: Mutex::new(None),
        }
    }

    /// The policy this cache was built with.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Read-through lookup.
    ///
    /// Returns the stored value while it is fresh; otherwise runs `fetcher`,
    /// stores its value and returns it. A failing fetcher leaves the cache
    /// untouched. The lock is not held while the fetcher runs.
    pub fn get<E>(&self, key: &str, fetcher: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        {
            let mut store = self.store.lock();
            let now = self.clock.now();
            if let Some(entry) = store.entries.get(key)
                && now.saturating_sub(entry.stored_at) < self.policy.ttl
            {
                let value = entry.value.clone();
                store.stats.hits += 1;
                tracing::debug!(key, "cache hit");
                return Ok(value);
            }
            store.stats.misses += 1;
        }

        tracing::debug!(key, "cache miss");
        let value = fetcher()?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Store a value unconditionally, stamped with the current time.
    pub fn set(&self, key: &str, value: V) {
        let stored_at = self.clock.now();
        self.store
            .lock()
            .entries
            .insert(key.to_string(), CacheEntry { value, stored_at });
    }

    /// The stored value regardless of freshness, without touching the counters.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.store.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// Remove entries.
    ///
    /// `None` clears the cache. `Some(pattern)` removes every key containing
    /// `pattern` and returns how many were removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut store = self.store.lock();
        let before = store.entries.len();
        match pattern {
            None => store.entries.clear(),
            Some(pattern) => store.entries.retain(|key, _| !key.contains(pattern)),
        }
        let removed = before - store.entries.len();
        tracing::debug!(?pattern, removed, "cache invalidate");
        removed
    }

    /// Whether `key` is present and younger than the ttl.
    pub fn is_fresh(&self, key: &str) -> bool {
        self.age(key).is_some_and(|age| age < self.policy.ttl)
    }

    /// Age of the entry under `key`, or `None` if absent.
    pub fn age(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.store
            .lock()
            .entries
            .get(key)
            .map(|e| now.saturating_sub(e.stored_at))
    }

    /// Evict every entry older than `max_age`. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let evicted = self.store.lock().sweep(now, self.policy.max_age);
        if evicted > 0 {
            tracing::debug!(evicted, "cache sweep");
        }
        evicted
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        CacheStats {
            entries: store.entries.len(),
            ..store.stats
        }
    }

    /// Start the background sweep. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return false;
        }

        let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let interval = self.policy.sweep_interval;
        let max_age = self.policy.max_age;

        let spawned = std::thread::Builder::new()
            .name("liveset-cache-sweep".into())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let evicted = store.lock().sweep(clock.now(), max_age);
                            if evicted > 0 {
                                tracing::debug!(evicted, "cache sweep");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(thread) => {
                tracing::info!(interval_ms = interval.as_millis() as u64, "cache sweep started");
                *sweeper = Some(Sweeper { stop, thread });
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not spawn cache sweep thread");
                false
            }
        }
    }

    /// Stop the background sweep and wait for it to exit.
    /// Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return false;
        };
        let _ = sweeper.stop.send(());
        if sweeper.thread.join().is_err() {
            tracing::warn!("cache sweep thread panicked");
        }
        tracing::info!("cache sweep stopped");
        true
    }

    /// Whether the background sweep is running.
    pub fn is_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }
}

impl<V> Drop for StateCache<V> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            let _ = sweeper.stop.send(());
            let _ = sweeper.thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;

    fn policy_ms(ttl: u64, max_age: u64, sweep: u64) -> CachePolicy {
        CachePolicy::new(
            Duration::from_millis(ttl),
            Duration::from_millis(max_age),
            Duration::from_millis(sweep),
        )
        .unwrap()
    }

    fn manual_cache() -> (StateCache<u32>, ManualClock) {
        let clock = ManualClock::new();
        let cache = StateCache::with_clock(policy_ms(1000, 5000, 10_000), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn default_policy_ratios() {
        let policy = CachePolicy::default();
        assert_eq!(policy.max_age(), policy.ttl() * 5);
        assert_eq!(policy.sweep_interval(), policy.ttl() * 10);
    }

    #[test]
    fn policy_rejects_bad_windows() {
        let ms = Duration::from_millis;
        assert_eq!(CachePolicy::new(ms(0), ms(10), ms(10)), Err(PolicyError::ZeroTtl));
        assert!(matches!(
            CachePolicy::new(ms(10), ms(10), ms(10)),
            Err(PolicyError::MaxAgeNotAboveTtl { .. })
        ));
        assert_eq!(CachePolicy::new(ms(10), ms(20), ms(0)), Err(PolicyError::ZeroSweepInterval));
    }

    #[test]
    fn read_through_fetches_once_while_fresh() {
        let (cache, clock) = manual_cache();
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(7)
        };

        assert_eq!(cache.get("k", fetch), Ok(7));
        clock.advance(Duration::from_millis(999));
        assert_eq!(cache.get("k", fetch), Ok(7));
        assert_eq!(calls.get(), 1);

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k", fetch), Ok(7));
        assert_eq!(calls.get(), 2);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let (cache, _clock) = manual_cache();
        assert_eq!(cache.get("k", || Err::<u32, _>("down")), Err("down"));
        assert!(cache.is_empty());
        assert_eq!(cache.get("k", || Ok::<_, &str>(3)), Ok(3));
    }

    #[test]
    fn freshness_and_age() {
        let (cache, clock) = manual_cache();
        assert_eq!(cache.age("missing"), None);
        assert!(!cache.is_fresh("missing"));

        cache.set("k", 1);
        assert!(cache.is_fresh("k"));
        assert_eq!(cache.age("k"), Some(Duration::ZERO));

        clock.advance(Duration::from_millis(1001));
        assert!(!cache.is_fresh("k"));
        assert_eq!(cache.age("k"), Some(Duration::from_millis(1001)));
        assert_eq!(cache.peek("k"), Some(1));
    }

    #[test]
    fn sweep_evicts_only_past_max_age() {
        let (cache, clock) = manual_cache();
        cache.set("old", 1);
        clock.advance(Duration::from_millis(3000));
        cache.set("young", 2);
        clock.advance(Duration::from_millis(2001));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.peek("old"), None);
        assert_eq!(cache.peek("young"), Some(2));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn invalidate_by_substring_and_all() {
        let (cache, _clock) = manual_cache();
        cache.set("track/1/", 1);
        cache.set("track/1/device/0/", 2);
        cache.set("track/11/", 3);
        cache.set("track/2/", 4);

        assert_eq!(cache.invalidate(Some("track/1/")), 2);
        assert_eq!(cache.peek("track/11/"), Some(3));
        assert_eq!(cache.peek("track/2/"), Some(4));

        assert_eq!(cache.invalidate(None), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (cache, _clock) = manual_cache();
        assert!(!cache.is_running());
        assert!(cache.start());
        assert!(!cache.start());
        assert!(cache.is_running());
        assert!(cache.stop());
        assert!(!cache.stop());
        assert!(!cache.is_running());
    }

    #[test]
    fn background_sweep_evicts_without_reads() {
        let clock = ManualClock::new();
        let cache = StateCache::with_clock(policy_ms(10, 50, 5), Arc::new(clock.clone()));
        cache.set("never-read-again", 1u32);
        assert!(cache.start());

        clock.advance(Duration::from_millis(51));
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !cache.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(cache.is_empty(), "sweep thread should have evicted the entry");
        cache.stop();
    }
}
