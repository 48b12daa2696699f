//! In-process metrics for ingestion and query paths.
//!
//! Everything is a lock-free atomic so hot paths can record without
//! contention. Values are exposed as a JSON snapshot on `/metrics`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Point-in-time value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Latency histogram with fixed millisecond buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Upper bounds in ms; the last bucket also takes everything above it.
    const BOUNDS_MS: [u64; 10] = [1, 5, 10, 25, 50, 100, 250, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BOUNDS_MS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Records the time elapsed since `start`.
    pub fn observe_since(&self, start: Instant) {
        self.observe(start.elapsed().as_millis() as u64);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// `(upper bound ms, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BOUNDS_MS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.count(),
            mean_ms: (self.mean() * 100.0).round() / 100.0,
            max_ms: self.max(),
        }
    }
}

/// Collected metrics for the analytics engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub batches_received: Counter,
    pub batches_rejected: Counter,
    pub events_received: Counter,
    pub events_saved: Counter,
    pub events_skipped: Counter,
    pub rate_limited_requests: Counter,

    // Event store
    pub store_append_errors: Counter,
    pub corrupt_records_skipped: Counter,
    pub scans: Counter,
    pub timeouts: Counter,

    // Latency
    pub ingest_latency_ms: Histogram,
    pub query_latency_ms: Histogram,

    pub ingests_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            batches_received: self.batches_received.get(),
            batches_rejected: self.batches_rejected.get(),
            events_received: self.events_received.get(),
            events_saved: self.events_saved.get(),
            events_skipped: self.events_skipped.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            store_append_errors: self.store_append_errors.get(),
            corrupt_records_skipped: self.corrupt_records_skipped.get(),
            scans: self.scans.get(),
            timeouts: self.timeouts.get(),
            ingest_latency: self.ingest_latency_ms.summary(),
            query_latency: self.query_latency_ms.summary(),
            ingests_in_flight: self.ingests_in_flight.get(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub mean_ms: f64,
    pub max_ms: u64,
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub batches_received: u64,
    pub batches_rejected: u64,
    pub events_received: u64,
    pub events_saved: u64,
    pub events_skipped: u64,
    pub rate_limited_requests: u64,
    pub store_append_errors: u64,
    pub corrupt_records_skipped: u64,
    pub scans: u64,
    pub timeouts: u64,
    pub ingest_latency: LatencySummary,
    pub query_latency: LatencySummary,
    pub ingests_in_flight: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
