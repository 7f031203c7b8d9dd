//! Operation log and per-operation timing.
//!
//! [`OperationLog`] keeps the most recent calls in a bounded ring buffer and
//! aggregates durations per operation name. Logging and timing are
//! independent: a caller may record one without the other.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{Clock, SystemClock};

/// Default ring buffer capacity.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// One logged call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRecord {
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
    /// Operation name.
    pub operation: String,
    /// Target path, if the operation had one.
    pub path: Option<String>,
    /// Arguments, opaque to the log.
    pub args: serde_json::Value,
    /// Result on success.
    pub result: Option<serde_json::Value>,
    /// Error message on failure.
    pub error: Option<String>,
}

impl OperationRecord {
    /// Whether this record describes a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate timing of one operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerformanceMetric {
    /// Number of timed calls.
    pub count: u64,
    /// Sum of all durations.
    pub total: Duration,
    /// `total / count`.
    pub avg: Duration,
    /// Shortest duration seen.
    pub min: Duration,
    /// Longest duration seen.
    pub max: Duration,
}

impl PerformanceMetric {
    fn first(elapsed: Duration) -> Self {
        Self {
            count: 1,
            total: elapsed,
            avg: elapsed,
            min: elapsed,
            max: elapsed,
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.avg = self.total / u32::try_from(self.count).unwrap_or(u32::MAX);
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
    }
}

/// Read-only summary of the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStats {
    /// Records currently buffered.
    pub total_operations: usize,
    /// Buffered records carrying an error.
    pub error_count: usize,
    /// Buffered records per operation name.
    pub operation_counts: BTreeMap<String, usize>,
    /// Timing table per operation name.
    pub metrics: BTreeMap<String, PerformanceMetric>,
}

/// Bounded call log with timing statistics.
pub struct OperationLog {
    records: VecDeque<OperationRecord>,
    capacity: usize,
    metrics: HashMap<String, PerformanceMetric>,
    timers: HashMap<String, Duration>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationLog")
            .field("records", &self.records.len())
            .field("capacity", &self.capacity)
            .field("metrics", &self.metrics.len())
            .finish()
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl OperationLog {
    /// Create a log keeping at most `capacity` records (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock::new()))
    }

    /// Create a log timing against `clock`.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
            metrics: HashMap::new(),
            timers: HashMap::new(),
            clock,
        }
    }

    /// Maximum number of buffered records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record, dropping the oldest once over capacity.
    pub fn log_operation(
        &mut self,
        operation: &str,
        path: Option<&str>,
        args: serde_json::Value,
        result: Option<serde_json::Value>,
        error: Option<&str>,
    ) {
        if let Some(error) = error {
            tracing::warn!(operation, path = path.unwrap_or(""), error, "operation failed");
        }

        self.records.push_back(OperationRecord {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            path: path.map(str::to_string),
            args,
            result,
            error: error.map(str::to_string),
        });
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Mark the start of a timed operation.
    pub fn start_timing(&mut self, operation: &str) {
        self.timers.insert(operation.to_string(), self.clock.now());
    }

    /// Finish a timed operation and fold the elapsed time into its metric.
    ///
    /// Returns `None` when no matching [`start_timing`](Self::start_timing) is pending.
    pub fn end_timing(&mut self, operation: &str) -> Option<Duration> {
        let started = self.timers.remove(operation)?;
        let elapsed = self.clock.now().saturating_sub(started);
        self.record_duration(operation, elapsed);
        Some(elapsed)
    }

    /// Fold an externally measured duration into the metric for `operation`.
    pub fn record_duration(&mut self, operation: &str, elapsed: Duration) {
        match self.metrics.get_mut(operation) {
            Some(metric) => metric.record(elapsed),
            None => {
                self.metrics
                    .insert(operation.to_string(), PerformanceMetric::first(elapsed));
            }
        }
    }

    /// Timing for one operation name.
    pub fn metric(&self, operation: &str) -> Option<PerformanceMetric> {
        self.metrics.get(operation).copied()
    }

    /// The last `n` failed records, oldest first.
    pub fn recent_errors(&self, n: usize) -> Vec<&OperationRecord> {
        let mut errors: Vec<_> = self
            .records
            .iter()
            .rev()
            .filter(|r| r.is_error())
            .take(n)
            .collect();
        errors.reverse();
        errors
    }

    /// Every buffered record for `operation`, oldest first.
    pub fn operations_by_type(&self, operation: &str) -> Vec<&OperationRecord> {
        self.records.iter().filter(|r| r.operation == operation).collect()
    }

    /// All buffered records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter()
    }

    /// Summary counts and the full metric table.
    pub fn stats(&self) -> LogStats {
        let mut operation_counts = BTreeMap::new();
        for record in &self.records {
            *operation_counts.entry(record.operation.clone()).or_insert(0) += 1;
        }
        LogStats {
            total_operations: self.records.len(),
            error_count: self.records.iter().filter(|r| r.is_error()).count(),
            operation_counts,
            metrics: self.metrics.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Drop every record, metric and pending timer.
    pub fn clear(&mut self) {
        self.records.clear();
        self.metrics.clear();
        self.timers.clear();
    }
}
