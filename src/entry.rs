//! Stored cache entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One cached response plus the metadata freshness evaluation needs.
///
/// Timestamps are wall-clock unix milliseconds rather than `Instant` so
/// entries written before a restart stay meaningful after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Response payload, shape-agnostic.
    pub data: Value,
    /// Creation instant, unix milliseconds.
    pub timestamp_ms: u64,
    /// Time-to-live from creation, milliseconds.
    pub ttl_ms: u64,
    /// Validator token from the origin (`ETag` header), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// HTTP status the payload was served with.
    pub status: u16,
    /// Response headers captured at fetch time.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl CacheEntry {
    /// Build an entry timestamped now.
    pub fn new(
        data: Value,
        ttl: Duration,
        status: u16,
        headers: HashMap<String, String>,
        etag: Option<String>,
    ) -> Self {
        Self {
            data,
            timestamp_ms: unix_ms(),
            ttl_ms: ttl.as_millis() as u64,
            etag,
            status,
            headers,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Age of the entry at `now_ms`, saturating at zero for clock skew.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    /// Re-stamp the entry as created now, keeping payload and validator.
    /// Used when a conditional refresh comes back `304 Not Modified`.
    pub fn renewed(mut self, ttl: Duration) -> Self {
        self.timestamp_ms = unix_ms();
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }
}

/// Current wall-clock time as unix milliseconds.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
