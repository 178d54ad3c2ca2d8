//! Cache statistics and metrics tracking
//!
//! Counters are monotonic. `Cache::clear` leaves them alone; only
//! `Cache::reset_stats` zeroes them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,

    /// Maximum allowed entries
    pub max_size: usize,

    /// Total number of successful get operations
    pub hits: u64,

    /// Total number of failed get operations (key not found or expired)
    pub misses: u64,

    /// Total number of set operations
    pub sets: u64,

    /// Total number of explicit deletions that removed an entry
    pub deletes: u64,

    /// Total number of evicted entries
    pub evictions: u64,

    /// Total number of expired entries removed
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate miss rate (misses / total accesses)
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Calculate fill percentage (size / max_size)
    pub fn fill_percentage(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.size as f64 / self.max_size as f64
        }
    }

    /// Total number of access operations (hits + misses)
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Thread-safe metrics collector for cache operations
///
/// Clones share the same counters, so every clone of a cache reports the
/// same numbers.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    sets: Arc<AtomicU64>,
    deletes: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    expirations: Arc<AtomicU64>,
}

impl MetricsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub(crate) fn snapshot(&self, size: usize, max_size: usize) -> CacheStats {
        CacheStats {
            size,
            max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub(crate) fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.sets,
            &self.deletes,
            &self.evictions,
            &self.expirations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
