//! 读穿缓存引擎：命中即答，未命中取源并回写，可选后台静默刷新。
//!
//! The engine fronts a [`Transport`] with an optional [`DurableStore`] and
//! serves every read through one path, in strict priority order:
//!
//! 1. **Coalesced** — a foreground fetch for the same key is already in
//!    flight; join it and resolve with its outcome.
//! 2. **Hit** — the store holds a fresh entry; answer from it immediately
//!    and (under `stale_while_revalidate`) schedule a background refresh.
//! 3. **Miss** — fetch through the coalescer, write successful responses
//!    through to the store, answer with the network result.
//!
//! A missing or broken store degrades the engine to a pass-through: every
//! read is a miss, writes are no-ops, and no storage failure ever reaches
//! a [`HttpCache::request`] caller.

mod refresh;

use crate::coalesce::{Panicked, RequestCoalescer};
use crate::config::CacheConfig;
use crate::entry::{unix_ms, CacheEntry};
use crate::error::Error;
use crate::freshness::Freshness;
use crate::key::CacheKey;
use crate::request::RequestDescriptor;
use crate::stats::{AtomicStats, CacheStats};
use crate::store::DurableStore;
use crate::transport::{Transport, TransportError};
use crate::Result;
use refresh::{RefreshJob, RefreshRunner, DEFAULT_REFRESH_LIMIT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// A response served by the engine, payload deserialized to `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: T,
    /// True when the payload came out of the store rather than the network.
    pub from_cache: bool,
}

/// Untyped engine response; `data` is the raw JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: Value,
    pub from_cache: bool,
}

impl CachedResponse {
    fn from_entry(entry: CacheEntry, from_cache: bool) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            data: entry.data,
            from_cache,
        }
    }
}

/// What a coalesced fetch settles with. The transport error is
/// reference-counted so every joined waiter can observe the same failure.
type FetchOutcome = std::result::Result<CachedResponse, Arc<TransportError>>;

/// Read-through HTTP response cache.
///
/// Construct via [`HttpCache::builder`], share via [`Arc`]. All methods
/// take `&self`; the engine is safe to call from any number of tasks.
pub struct HttpCache {
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn DurableStore>>,
    default_config: CacheConfig,
    coalescer: RequestCoalescer<FetchOutcome>,
    refresher: RefreshRunner,
    stats: Arc<AtomicStats>,
}

impl HttpCache {
    pub fn builder(transport: Arc<dyn Transport>) -> HttpCacheBuilder {
        HttpCacheBuilder::new(transport)
    }

    /// Typed read-through request.
    ///
    /// Resolves `config` (engine default when `None`), then walks the
    /// coalesced → hit → miss path. The payload is deserialized to `T`
    /// after the cache decision, so a type mismatch surfaces as
    /// [`Error::Serialization`] without disturbing the stored entry.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        config: Option<&CacheConfig>,
    ) -> Result<Response<T>> {
        let raw = self.request_raw(descriptor, config).await?;
        let data = serde_json::from_value(raw.data)?;
        Ok(Response {
            status: raw.status,
            headers: raw.headers,
            data,
            from_cache: raw.from_cache,
        })
    }

    /// Untyped read-through request; the typed path builds on this.
    pub async fn request_raw(
        &self,
        descriptor: &RequestDescriptor,
        config: Option<&CacheConfig>,
    ) -> Result<CachedResponse> {
        let config = config.unwrap_or(&self.default_config);
        let key = CacheKey::derive(descriptor);

        // Someone is already fetching this key; share their outcome.
        if let Some(flight) = self.coalescer.join_existing(&key) {
            AtomicStats::bump(&self.stats.coalesced);
            debug!(key = %key, "joined in-flight fetch");
            return Self::settle(flight.await);
        }

        if let Some(store) = &self.store {
            if let Some(entry) = self.load_fresh(store, &key).await {
                AtomicStats::bump(&self.stats.hits);
                debug!(key = %key, age_ms = entry.age_ms(unix_ms()), "cache hit");
                if config.stale_while_revalidate {
                    self.refresher.spawn(RefreshJob {
                        transport: Arc::clone(&self.transport),
                        store: Arc::clone(store),
                        stats: Arc::clone(&self.stats),
                        descriptor: descriptor.clone(),
                        key: key.clone(),
                        ttl: config.ttl,
                        etag: entry.etag.clone(),
                    });
                }
                return Ok(CachedResponse::from_entry(entry, true));
            }
        }

        AtomicStats::bump(&self.stats.misses);
        debug!(key = %key, "cache miss, fetching");
        let (flight, owner) = self.coalescer.run(&key, || {
            let transport = Arc::clone(&self.transport);
            let store = self.store.clone();
            let stats = Arc::clone(&self.stats);
            let descriptor = descriptor.clone();
            let key = key.clone();
            let ttl = config.ttl;
            async move {
                let response = match transport.request(&descriptor).await {
                    Ok(response) => response,
                    Err(e) => return Err(Arc::new(e)),
                };
                if !response.is_success() {
                    debug!(key = %key, status = response.status, "non-success response not cached");
                    return Ok(CachedResponse {
                        status: response.status,
                        headers: response.headers,
                        data: response.data,
                        from_cache: false,
                    });
                }
                let etag = response.etag().map(str::to_string);
                let entry = CacheEntry::new(
                    response.data,
                    ttl,
                    response.status,
                    response.headers,
                    etag,
                );
                Self::write_through(store.as_ref(), &stats, &key, &entry).await;
                Ok(CachedResponse::from_entry(entry, false))
            }
        });
        if !owner {
            // Lost the registration race to a concurrent miss for the
            // same key; we ride along instead.
            AtomicStats::bump(&self.stats.coalesced);
        }
        Self::settle(flight.await)
    }

    /// Drop every stored entry. A no-op without a store.
    pub async fn clear(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.clear().await
    }

    /// Drop every entry whose key contains `pattern`; returns how many
    /// were removed.
    ///
    /// Keys embed the request path and canonical query verbatim, so URL
    /// fragments make natural patterns: `"/roms"` sweeps a whole
    /// resource, `"platform_id=1"` just the listings for one platform.
    pub async fn clear_matching(&self, pattern: &str) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut removed = 0;
        for key in store.keys().await? {
            if key.contains(pattern) && store.delete(&key).await? {
                AtomicStats::bump(&self.stats.deletes);
                removed += 1;
            }
        }
        debug!(pattern, removed, "pattern invalidation");
        Ok(removed)
    }

    /// Number of stored entries, fresh or not. Zero when degraded.
    pub async fn len(&self) -> usize {
        match &self.store {
            Some(store) => match store.len().await {
                Ok(len) => len,
                Err(e) => {
                    warn!(error = %e, "store len failed");
                    0
                }
            },
            None => 0,
        }
    }

    /// False when the engine runs without a store and passes every
    /// request through to the transport.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Identifier of the attached store backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|store| store.name())
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Watch over the number of background refreshes that have finished.
    ///
    /// Refreshes are fire-and-forget; this is the hook for code (tests,
    /// shutdown paths) that needs to know one landed.
    pub fn refresh_watch(&self) -> watch::Receiver<u64> {
        self.refresher.subscribe()
    }

    /// Map a settled flight back to the caller-facing result.
    fn settle(outcome: std::result::Result<FetchOutcome, Panicked>) -> Result<CachedResponse> {
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(transport)) => Err(Error::Transport(transport)),
            Err(panicked) => Err(Error::RequestPanicked(panicked.0)),
        }
    }

    /// Fresh stored entry for `key`, or `None`.
    ///
    /// Expired entries are evicted on the spot, so the store only ever
    /// holds entries that were live at last touch. Store failures are
    /// absorbed here and count as misses.
    async fn load_fresh(&self, store: &Arc<dyn DurableStore>, key: &CacheKey) -> Option<CacheEntry> {
        match store.get(key).await {
            Ok(Some(entry)) => {
                if Freshness::of(&entry).is_fresh() {
                    Some(entry)
                } else {
                    // Count the eviction only once it actually landed.
                    match store.delete(key).await {
                        Ok(true) => AtomicStats::bump(&self.stats.deletes),
                        Ok(false) => {}
                        Err(e) => {
                            AtomicStats::bump(&self.stats.errors);
                            warn!(key = %key, error = %e, "failed to evict expired entry");
                        }
                    }
                    debug!(key = %key, "entry expired, treating as miss");
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                warn!(key = %key, error = %e, "store read failed, treating as miss");
                None
            }
        }
    }

    /// Persist a fetched entry. Failures are logged and absorbed; the
    /// caller already holds the response and gets it either way.
    async fn write_through(
        store: Option<&Arc<dyn DurableStore>>,
        stats: &AtomicStats,
        key: &CacheKey,
        entry: &CacheEntry,
    ) {
        let Some(store) = store else {
            return;
        };
        match store.put(key, entry).await {
            Ok(()) => {
                AtomicStats::bump(&stats.writes);
                debug!(key = %key, backend = store.name(), "entry stored");
            }
            Err(e) => {
                AtomicStats::bump(&stats.errors);
                warn!(key = %key, error = %e, "write-through failed");
            }
        }
    }
}

/// Builder for [`HttpCache`].
pub struct HttpCacheBuilder {
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn DurableStore>>,
    default_config: CacheConfig,
    refresh_limit: usize,
}

impl HttpCacheBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            store: None,
            default_config: CacheConfig::default(),
            refresh_limit: DEFAULT_REFRESH_LIMIT,
        }
    }

    /// Attach a store. Without one the engine passes every request
    /// through to the transport.
    pub fn with_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach a store from a fallible open, degrading to pass-through
    /// when the open failed.
    ///
    /// Storage is an accelerator here, not a dependency: a cache
    /// directory that cannot be created should cost a warning, not the
    /// process.
    pub fn with_opened_store<S>(mut self, opened: Result<S>) -> Self
    where
        S: DurableStore + 'static,
    {
        match opened {
            Ok(store) => self.store = Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "cache store unavailable, running without cache");
                self.store = None;
            }
        }
        self
    }

    /// Engine-wide default policy for requests that pass no config.
    pub fn with_default_config(mut self, config: CacheConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Bound on concurrently running background refreshes. Default 8;
    /// clamped to at least 1.
    pub fn with_refresh_limit(mut self, limit: usize) -> Self {
        self.refresh_limit = limit;
        self
    }

    pub fn build(self) -> HttpCache {
        HttpCache {
            transport: self.transport,
            store: self.store,
            default_config: self.default_config,
            coalescer: RequestCoalescer::new(),
            refresher: RefreshRunner::new(self.refresh_limit),
            stats: Arc::new(AtomicStats::new()),
        }
    }
}
