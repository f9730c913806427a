//! Cache Metrics Module
//!
//! Tracks cache performance statistics: hits, misses, admission outcomes,
//! evictions, and shed work.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

// == Metrics ==
/// Concurrent cache performance counters.
///
/// Counters are bumped with relaxed atomics from whichever thread observes
/// the event; `cost_in_use` is a gauge the write worker alone publishes
/// after each applied operation. Read everything through
/// [`Metrics::snapshot`].
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    hits: AtomicU64,
    misses: AtomicU64,
    keys_admitted: AtomicU64,
    keys_updated: AtomicU64,
    keys_rejected: AtomicU64,
    keys_evicted: AtomicU64,
    sets_dropped: AtomicU64,
    accesses_dropped: AtomicU64,
    cost_added: AtomicU64,
    cost_evicted: AtomicU64,
    cost_in_use: AtomicI64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // == Recording Methods ==
    /// Records a successful lookup.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed lookup (absent, expired, or conflict mismatch).
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a new entry accepted by the admission policy.
    pub fn record_admission(&self, cost: i64) {
        self.keys_admitted.fetch_add(1, Ordering::Relaxed);
        self.cost_added.fetch_add(cost as u64, Ordering::Relaxed);
    }

    /// Records an in-place replacement of a resident entry.
    pub fn record_update(&self) {
        self.keys_updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry turned away by the admission policy.
    pub fn record_rejection(&self) {
        self.keys_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry evicted to make room.
    pub fn record_eviction(&self, cost: i64) {
        self.keys_evicted.fetch_add(1, Ordering::Relaxed);
        self.cost_evicted.fetch_add(cost as u64, Ordering::Relaxed);
    }

    /// Records a set shed because the write buffer was full.
    pub fn record_set_dropped(&self) {
        self.sets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an access record shed on a contended stripe.
    pub fn record_access_dropped(&self) {
        self.accesses_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Publishes the cost currently charged against the budget.
    pub fn set_cost_in_use(&self, cost: i64) {
        self.cost_in_use.store(cost, Ordering::Relaxed);
    }

    // == Hit Rate ==
    /// Calculates the hit rate as a value between 0.0 and 1.0.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys_admitted: self.keys_admitted.load(Ordering::Relaxed),
            keys_updated: self.keys_updated.load(Ordering::Relaxed),
            keys_rejected: self.keys_rejected.load(Ordering::Relaxed),
            keys_evicted: self.keys_evicted.load(Ordering::Relaxed),
            sets_dropped: self.sets_dropped.load(Ordering::Relaxed),
            accesses_dropped: self.accesses_dropped.load(Ordering::Relaxed),
            cost_added: self.cost_added.load(Ordering::Relaxed),
            cost_evicted: self.cost_evicted.load(Ordering::Relaxed),
            cost_in_use: self.cost_in_use.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }

    // == Reset ==
    /// Zeroes every counter and the cost gauge.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.keys_admitted.store(0, Ordering::Relaxed);
        self.keys_updated.store(0, Ordering::Relaxed);
        self.keys_rejected.store(0, Ordering::Relaxed);
        self.keys_evicted.store(0, Ordering::Relaxed);
        self.sets_dropped.store(0, Ordering::Relaxed);
        self.accesses_dropped.store(0, Ordering::Relaxed);
        self.cost_added.store(0, Ordering::Relaxed);
        self.cost_evicted.store(0, Ordering::Relaxed);
        self.cost_in_use.store(0, Ordering::Relaxed);
    }
}

// == Metrics Snapshot ==
/// Point-in-time view of cache performance counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Successful lookups
    pub hits: u64,
    /// Failed lookups, including expired entries
    pub misses: u64,
    /// Entries accepted by the admission policy
    pub keys_admitted: u64,
    /// In-place replacements of resident entries
    pub keys_updated: u64,
    /// Entries turned away by the admission policy
    pub keys_rejected: u64,
    /// Entries evicted to make room
    pub keys_evicted: u64,
    /// Sets shed because the write buffer was full
    pub sets_dropped: u64,
    /// Access records shed on contended stripes
    pub accesses_dropped: u64,
    /// Total cost of all admitted entries
    pub cost_added: u64,
    /// Total cost released by evictions
    pub cost_evicted: u64,
    /// Cost currently charged against the budget
    pub cost_in_use: i64,
    /// hits / (hits + misses), or 0.0 before any lookup
    pub hit_rate: f64,
}
