//! Shared fixtures for engine-level tests.
#![allow(dead_code)]

use async_trait::async_trait;
use readthrough::store::MemoryStore;
use readthrough::transport::{Transport, TransportError, TransportResponse};
use readthrough::{HttpCache, RequestDescriptor};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Scripted {
    delay: Duration,
    result: Result<TransportResponse, TransportError>,
}

/// Scripted transport: responses are served in enqueue order, each
/// optionally delayed. Running past the script is an error, so a test
/// that provokes an unexpected network call fails loudly.
pub struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    revalidations: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            revalidations: Mutex::new(Vec::new()),
        })
    }

    fn enqueue(&self, scripted: Scripted) {
        self.script.lock().unwrap().push_back(scripted);
    }

    pub fn enqueue_json(&self, data: Value) {
        self.enqueue(Scripted {
            delay: Duration::ZERO,
            result: Ok(response(200, data, None)),
        });
    }

    pub fn enqueue_json_with_etag(&self, data: Value, etag: &str) {
        self.enqueue(Scripted {
            delay: Duration::ZERO,
            result: Ok(response(200, data, Some(etag))),
        });
    }

    pub fn enqueue_status(&self, status: u16, data: Value) {
        self.enqueue(Scripted {
            delay: Duration::ZERO,
            result: Ok(response(status, data, None)),
        });
    }

    pub fn enqueue_not_modified(&self) {
        self.enqueue(Scripted {
            delay: Duration::ZERO,
            result: Ok(response(304, Value::Null, None)),
        });
    }

    pub fn enqueue_delayed(&self, delay: Duration, data: Value) {
        self.enqueue(Scripted {
            delay,
            result: Ok(response(200, data, None)),
        });
    }

    pub fn enqueue_error(&self, message: &str) {
        self.enqueue(Scripted {
            delay: Duration::ZERO,
            result: Err(TransportError::Other(message.to_string())),
        });
    }

    pub fn enqueue_delayed_error(&self, delay: Duration, message: &str) {
        self.enqueue(Scripted {
            delay,
            result: Err(TransportError::Other(message.to_string())),
        });
    }

    /// Total network calls performed, plain and conditional.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Validators received through `revalidate`, in call order.
    pub fn revalidations(&self) -> Vec<String> {
        self.revalidations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(
        &self,
        _descriptor: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let Some(scripted) = next else {
            return Err(TransportError::Other("transport script exhausted".to_string()));
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.result
    }

    async fn revalidate(
        &self,
        descriptor: &RequestDescriptor,
        etag: &str,
    ) -> Result<TransportResponse, TransportError> {
        self.revalidations.lock().unwrap().push(etag.to_string());
        self.request(descriptor).await
    }
}

fn response(status: u16, data: Value, etag: Option<&str>) -> TransportResponse {
    let mut headers = HashMap::from([(
        "content-type".to_string(),
        "application/json".to_string(),
    )]);
    if let Some(etag) = etag {
        headers.insert("etag".to_string(), etag.to_string());
    }
    TransportResponse {
        status,
        headers,
        data,
    }
}

/// Engine over a memory store, plus a handle on the store itself so
/// tests can inspect what actually got written.
pub fn cache_with_memory(transport: &Arc<FakeTransport>) -> (HttpCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(64));
    let cache = HttpCache::builder(Arc::clone(transport) as Arc<dyn Transport>)
        .with_store(Arc::clone(&store) as Arc<dyn readthrough::DurableStore>)
        .build();
    (cache, store)
}

/// Block until at least `at_least` background refreshes have finished.
pub async fn await_refresh_count(cache: &HttpCache, at_least: u64) {
    let mut watch = cache.refresh_watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        while *watch.borrow_and_update() < at_least {
            watch.changed().await.expect("engine alive");
        }
    })
    .await
    .expect("background refresh completed in time");
}
