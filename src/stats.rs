//! Engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fresh entries served from the store.
    pub hits: u64,
    /// Reads that went to the network (absent, expired, or corrupt entry).
    pub misses: u64,
    /// Callers that joined an already in-flight foreground fetch.
    pub coalesced: u64,
    /// Entries written through to the store.
    pub writes: u64,
    /// Entries removed (lazy expiry, corruption, invalidation).
    pub deletes: u64,
    /// Background refresh tasks that ran to completion.
    pub refreshes: u64,
    /// Refreshes skipped because the concurrency bound was saturated.
    pub refreshes_skipped: u64,
    /// Store or refresh failures absorbed without surfacing to callers.
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters shared across engine tasks.
#[derive(Debug, Default)]
pub(crate) struct AtomicStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub coalesced: AtomicU64,
    pub writes: AtomicU64,
    pub deletes: AtomicU64,
    pub refreshes: AtomicU64,
    pub refreshes_skipped: AtomicU64,
    pub errors: AtomicU64,
}

impl AtomicStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refreshes_skipped: self.refreshes_skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
