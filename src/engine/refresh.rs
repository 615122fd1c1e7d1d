//! Background refresh execution.
//!
//! Stale-while-revalidate hits schedule a [`RefreshJob`] here instead of
//! blocking the caller. The runner bounds how many jobs run at once with
//! a semaphore and, rather than queueing past the bound, drops the job:
//! the entry being refreshed is still fresh, so another hit will try
//! again soon enough. A watch channel counts completed jobs so callers
//! (tests mostly) can await "a refresh has landed" without polling.

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::request::RequestDescriptor;
use crate::stats::AtomicStats;
use crate::store::DurableStore;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, warn};

/// Default concurrent background refresh bound.
pub(crate) const DEFAULT_REFRESH_LIMIT: usize = 8;

/// Bounded executor for fire-and-forget refresh tasks.
pub(crate) struct RefreshRunner {
    limiter: Arc<Semaphore>,
    completions: watch::Sender<u64>,
}

impl RefreshRunner {
    pub fn new(limit: usize) -> Self {
        let (completions, _) = watch::channel(0);
        Self {
            limiter: Arc::new(Semaphore::new(limit.max(1))),
            completions,
        }
    }

    /// Receiver over the number of refresh tasks that have finished,
    /// successfully or not.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.completions.subscribe()
    }

    #[cfg(test)]
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Run `job` in the background if a permit is free, otherwise drop it.
    ///
    /// The permit is claimed synchronously, so once this returns the
    /// runner's occupancy already reflects the job.
    pub fn spawn(&self, job: RefreshJob) {
        let permit = match Arc::clone(&self.limiter).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                AtomicStats::bump(&job.stats.refreshes_skipped);
                debug!(key = %job.key, "refresh bound saturated, skipping");
                return;
            }
        };
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let _permit = permit;
            job.run().await;
            completions.send_modify(|count| *count += 1);
        });
    }
}

/// One scheduled revalidation of a stored entry.
///
/// Failures never propagate anywhere: the stored entry is still fresh,
/// so the job just logs, counts the error and leaves it in place.
pub(crate) struct RefreshJob {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn DurableStore>,
    pub stats: Arc<AtomicStats>,
    pub descriptor: RequestDescriptor,
    pub key: CacheKey,
    pub ttl: Duration,
    pub etag: Option<String>,
}

impl RefreshJob {
    pub async fn run(self) {
        let outcome = match &self.etag {
            Some(etag) => self.transport.revalidate(&self.descriptor, etag).await,
            None => self.transport.request(&self.descriptor).await,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                debug!(key = %self.key, error = %e, "background refresh failed, keeping entry");
                return;
            }
        };

        if response.status == 304 {
            // Origin confirmed our payload is current; restamp it.
            match self.store.get(&self.key).await {
                Ok(Some(entry)) => self.write(entry.renewed(self.ttl)).await,
                Ok(None) => {
                    // Invalidated between scheduling and renewal; the next
                    // read is a plain miss.
                    debug!(key = %self.key, "entry gone before renewal");
                }
                Err(e) => {
                    AtomicStats::bump(&self.stats.errors);
                    warn!(key = %self.key, error = %e, "store read failed during renewal");
                }
            }
            return;
        }

        if !response.is_success() {
            AtomicStats::bump(&self.stats.errors);
            debug!(
                key = %self.key,
                status = response.status,
                "refresh answered non-success, keeping entry"
            );
            return;
        }

        let etag = response.etag().map(str::to_string);
        let entry = CacheEntry::new(
            response.data,
            self.ttl,
            response.status,
            response.headers,
            etag,
        );
        self.write(entry).await;
    }

    async fn write(&self, entry: CacheEntry) {
        match self.store.put(&self.key, &entry).await {
            Ok(()) => {
                AtomicStats::bump(&self.stats.writes);
                AtomicStats::bump(&self.stats.refreshes);
                debug!(key = %self.key, "background refresh stored");
            }
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                warn!(key = %self.key, error = %e, "failed to store refreshed entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::{TransportError, TransportResponse};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, timeout};

    struct SlowOk {
        delay: Duration,
    }

    #[async_trait]
    impl Transport for SlowOk {
        async fn request(
            &self,
            _descriptor: &RequestDescriptor,
        ) -> Result<TransportResponse, TransportError> {
            sleep(self.delay).await;
            Ok(TransportResponse {
                status: 200,
                headers: HashMap::new(),
                data: json!({"refreshed": true}),
            })
        }
    }

    struct NotModified {
        revalidations: AtomicUsize,
    }

    #[async_trait]
    impl Transport for NotModified {
        async fn request(
            &self,
            _descriptor: &RequestDescriptor,
        ) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status: 200,
                headers: HashMap::new(),
                data: json!({"full": true}),
            })
        }

        async fn revalidate(
            &self,
            _descriptor: &RequestDescriptor,
            _etag: &str,
        ) -> Result<TransportResponse, TransportError> {
            self.revalidations.fetch_add(1, Ordering::SeqCst);
            Ok(TransportResponse {
                status: 304,
                headers: HashMap::new(),
                data: Value::Null,
            })
        }
    }

    fn job(
        transport: Arc<dyn Transport>,
        store: Arc<dyn DurableStore>,
        stats: Arc<AtomicStats>,
    ) -> RefreshJob {
        RefreshJob {
            transport,
            store,
            stats,
            descriptor: RequestDescriptor::get("/roms"),
            key: CacheKey::from("GET /roms"),
            ttl: Duration::from_secs(60),
            etag: None,
        }
    }

    async fn await_completions(runner: &RefreshRunner, at_least: u64) {
        let mut seen = runner.subscribe();
        timeout(Duration::from_secs(2), async {
            while *seen.borrow_and_update() < at_least {
                seen.changed().await.expect("runner alive");
            }
        })
        .await
        .expect("refresh completed in time");
    }

    #[tokio::test]
    async fn test_zero_limit_clamps_to_one() {
        assert_eq!(RefreshRunner::new(0).available_permits(), 1);
        assert_eq!(RefreshRunner::new(4).available_permits(), 4);
    }

    #[tokio::test]
    async fn test_completion_signal_fires_after_store_write() {
        let runner = RefreshRunner::new(2);
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new(8));
        let stats = Arc::new(AtomicStats::new());

        runner.spawn(job(
            Arc::new(SlowOk {
                delay: Duration::ZERO,
            }),
            Arc::clone(&store),
            Arc::clone(&stats),
        ));
        await_completions(&runner, 1).await;

        let stored = store
            .get(&CacheKey::from("GET /roms"))
            .await
            .expect("get")
            .expect("entry");
        assert_eq!(stored.data, json!({"refreshed": true}));
        assert_eq!(stats.snapshot().refreshes, 1);
        assert_eq!(stats.snapshot().writes, 1);
    }

    #[tokio::test]
    async fn test_saturated_runner_drops_the_job() {
        let runner = RefreshRunner::new(1);
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new(8));
        let stats = Arc::new(AtomicStats::new());

        // The first job claims the only permit synchronously and then
        // sleeps; the second finds the runner full.
        runner.spawn(job(
            Arc::new(SlowOk {
                delay: Duration::from_millis(200),
            }),
            Arc::clone(&store),
            Arc::clone(&stats),
        ));
        runner.spawn(job(
            Arc::new(SlowOk {
                delay: Duration::ZERO,
            }),
            Arc::clone(&store),
            Arc::clone(&stats),
        ));
        assert_eq!(stats.snapshot().refreshes_skipped, 1);

        await_completions(&runner, 1).await;
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.refreshes, 1);
        assert_eq!(snapshot.refreshes_skipped, 1);
    }

    #[tokio::test]
    async fn test_not_modified_renews_without_replacing_payload() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new(8));
        let key = CacheKey::from("GET /platforms");
        let mut old = CacheEntry::new(
            json!({"full": false}),
            Duration::from_secs(60),
            200,
            HashMap::new(),
            Some("\"v1\"".to_string()),
        );
        old.timestamp_ms = 1;
        store.put(&key, &old).await.expect("seed");

        let transport = Arc::new(NotModified {
            revalidations: AtomicUsize::new(0),
        });
        let stats = Arc::new(AtomicStats::new());
        let mut renewal = job(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&store),
            Arc::clone(&stats),
        );
        renewal.key = key.clone();
        renewal.etag = Some("\"v1\"".to_string());
        renewal.run().await;

        let renewed = store.get(&key).await.expect("get").expect("entry");
        assert_eq!(renewed.data, json!({"full": false}), "304 must keep payload");
        assert!(renewed.timestamp_ms > old.timestamp_ms);
        assert_eq!(renewed.etag.as_deref(), Some("\"v1\""));
        assert_eq!(transport.revalidations.load(Ordering::SeqCst), 1);
        assert_eq!(stats.snapshot().refreshes, 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_the_stored_entry() {
        struct AlwaysDown;

        #[async_trait]
        impl Transport for AlwaysDown {
            async fn request(
                &self,
                _descriptor: &RequestDescriptor,
            ) -> Result<TransportResponse, TransportError> {
                Err(TransportError::Other("origin unreachable".to_string()))
            }
        }

        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new(8));
        let key = CacheKey::from("GET /roms");
        let seeded = CacheEntry::new(
            json!({"stale": true}),
            Duration::from_secs(60),
            200,
            HashMap::new(),
            None,
        );
        store.put(&key, &seeded).await.expect("seed");

        let stats = Arc::new(AtomicStats::new());
        job(Arc::new(AlwaysDown), Arc::clone(&store), Arc::clone(&stats))
            .run()
            .await;

        let kept = store.get(&key).await.expect("get").expect("entry");
        assert_eq!(kept.data, json!({"stale": true}));
        assert_eq!(stats.snapshot().refreshes, 0);
        assert_eq!(stats.snapshot().errors, 1);
    }
}
