//! Cache metrics.
//!
//! In-process counters back [`CacheStats`]; every event is also mirrored to
//! the `metrics` facade for the Prometheus exporter.

use crate::store::StoreInfo;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metric names for the cache engine.
pub mod names {
    /// Total cache hits.
    pub const HITS_TOTAL: &str = "cachet_cache_hits_total";
    /// Total cache misses.
    pub const MISSES_TOTAL: &str = "cachet_cache_misses_total";
    /// Total successful writes.
    pub const WRITES_TOTAL: &str = "cachet_cache_writes_total";
    /// Total keys removed by delete, invalidation, or clear.
    pub const INVALIDATED_KEYS_TOTAL: &str = "cachet_cache_invalidated_keys_total";
    /// Total failed store calls absorbed by the engine.
    pub const STORE_ERRORS_TOTAL: &str = "cachet_cache_store_errors_total";
    /// `get` latency in seconds.
    pub const GET_DURATION_SECONDS: &str = "cachet_cache_get_duration_seconds";
    /// Warm-up routine runs.
    pub const WARMUP_RUNS_TOTAL: &str = "cachet_cache_warmup_runs_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(names::WRITES_TOTAL, "Total number of successful cache writes");
    describe_counter!(
        names::INVALIDATED_KEYS_TOTAL,
        "Total number of keys removed by delete, invalidation or clear"
    );
    describe_counter!(
        names::STORE_ERRORS_TOTAL,
        "Total number of backing store failures degraded to miss/false"
    );
    describe_histogram!(names::GET_DURATION_SECONDS, "Cache get latency in seconds");
    describe_counter!(names::WARMUP_RUNS_TOTAL, "Total number of warm-up routine runs");
}

/// Hit/miss and latency counters.
///
/// Counters only grow; they reset when the process restarts.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    samples: AtomicU64,
    total_micros: AtomicU64,
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit and its latency.
    pub fn record_hit(&self, elapsed: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!(names::HITS_TOTAL).increment(1);
        self.record_latency(elapsed, "hit");
    }

    /// Record a miss and its latency.
    pub fn record_miss(&self, elapsed: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!(names::MISSES_TOTAL).increment(1);
        self.record_latency(elapsed, "miss");
    }

    fn record_latency(&self, elapsed: Duration, outcome: &'static str) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        histogram!(names::GET_DURATION_SECONDS, "outcome" => outcome).record(elapsed.as_secs_f64());
    }

    /// Record `count` successful writes.
    pub fn record_writes(count: u64) {
        counter!(names::WRITES_TOTAL).increment(count);
    }

    /// Record keys removed by `operation`.
    pub fn record_invalidated(operation: &'static str, count: u64) {
        counter!(names::INVALIDATED_KEYS_TOTAL, "operation" => operation).increment(count);
    }

    /// Record a store failure that was degraded instead of surfaced.
    pub fn record_store_error(operation: &'static str) {
        counter!(names::STORE_ERRORS_TOTAL, "operation" => operation).increment(1);
    }

    /// Record a warm-up routine outcome.
    pub fn record_warmup(routine: &str, success: bool) {
        counter!(
            names::WARMUP_RUNS_TOTAL,
            "routine" => routine.to_string(),
            "status" => if success { "success" } else { "failure" }
        )
        .increment(1);
    }

    /// Hits so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Misses so far.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`, or 0 before the first `get`.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Mean `get` latency in milliseconds, or 0 before the first `get`.
    pub fn avg_response_time_ms(&self) -> f64 {
        let samples = self.samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        self.total_micros.load(Ordering::Relaxed) as f64 / samples as f64 / 1000.0
    }

    /// Point-in-time snapshot merged with store introspection.
    pub fn snapshot(&self, store: Option<StoreInfo>) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
            hit_rate: self.hit_rate(),
            avg_response_time_ms: self.avg_response_time_ms(),
            key_count: store.map(|info| info.key_count),
            memory_usage_bytes: store.map(|info| info.used_memory_bytes),
            collected_at: Utc::now(),
        }
    }
}

/// Cache statistics as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Successful lookups.
    pub hits: u64,
    /// Lookups that returned nothing.
    pub misses: u64,
    /// `hits / (hits + misses)`.
    pub hit_rate: f64,
    /// Mean `get` latency in milliseconds.
    pub avg_response_time_ms: f64,
    /// Keys in the store, `None` when the store could not be queried.
    pub key_count: Option<u64>,
    /// Store memory usage in bytes, `None` when the store could not be queried.
    pub memory_usage_bytes: Option<u64>,
    /// When the snapshot was taken.
    pub collected_at: DateTime<Utc>,
}
