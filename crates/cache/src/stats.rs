//! Atomic counters for one chunked cache

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[derive(Debug)]
pub(crate) struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    partial_misses: AtomicU64,
    producer_calls: AtomicU64,
    producer_failures: AtomicU64,
    write_failures: AtomicU64,
    fragments_written: AtomicU64,
    stats_since: SystemTime,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            partial_misses: AtomicU64::new(0),
            producer_calls: AtomicU64::new(0),
            producer_failures: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            fragments_written: AtomicU64::new(0),
            stats_since: SystemTime::now(),
        }
    }
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial_miss(&self) {
        self.partial_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_call(&self) {
        self.producer_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_failure(&self) {
        self.producer_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failures(&self, count: u64) {
        self.write_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fragments_written(&self, count: u64) {
        self.fragments_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChunkedCacheStatistics {
        ChunkedCacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            partial_misses: self.partial_misses.load(Ordering::Relaxed),
            producer_calls: self.producer_calls.load(Ordering::Relaxed),
            producer_failures: self.producer_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            fragments_written: self.fragments_written.load(Ordering::Relaxed),
            stats_since: self.stats_since,
        }
    }
}

/// Point-in-time view of a cache's counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedCacheStatistics {
    /// Reads served entirely from fragments
    pub hits: u64,
    /// Reads that fell through to the producer
    pub misses: u64,
    /// Misses where metadata existed but fragments were lost or invalid
    pub partial_misses: u64,
    pub producer_calls: u64,
    pub producer_failures: u64,
    /// Metadata or fragment writes the store rejected
    pub write_failures: u64,
    pub fragments_written: u64,
    pub stats_since: SystemTime,
}

impl ChunkedCacheStatistics {
    /// Fraction of reads served from the store
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
