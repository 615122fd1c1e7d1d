//! Per-request cache policy.

use std::time::Duration;

/// Default time-to-live applied when a caller supplies no config.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Caching policy for one logical kind of resource.
///
/// Callers pick a config per request (list endpoints, detail endpoints
/// and searches usually want different windows); the engine falls back to
/// its own default when none is supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// How long an entry created under this config stays fresh.
    pub ttl: Duration,
    /// Serve fresh hits immediately and refresh them in the background.
    /// When off, hits are served strictly fresh with no silent refresh.
    pub stale_while_revalidate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            stale_while_revalidate: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the freshness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable background refresh on hits.
    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}
