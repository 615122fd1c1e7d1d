//! Freshness classification for stored entries.
//!
//! There are exactly two states at the storage layer: an entry inside its
//! TTL window is `Fresh`, anything past it is `Expired` and must be
//! treated as absent. Staleness-aware serving (returning a value while
//! refreshing it) is the orchestrator's business, not the store's.

use crate::entry::{unix_ms, CacheEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Expired,
}

impl Freshness {
    /// Classify an entry against an explicit clock reading.
    ///
    /// The window is inclusive: an entry whose age equals its TTL is
    /// still fresh.
    pub fn of_at(entry: &CacheEntry, now_ms: u64) -> Freshness {
        if entry.age_ms(now_ms) <= entry.ttl_ms {
            Freshness::Fresh
        } else {
            Freshness::Expired
        }
    }

    /// Classify an entry against the current wall clock.
    pub fn of(entry: &CacheEntry) -> Freshness {
        Self::of_at(entry, unix_ms())
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}
