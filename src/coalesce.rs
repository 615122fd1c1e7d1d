//! In-flight request coalescing.
//!
//! A transient table of cache key → shared future. While a foreground
//! fetch for a key is outstanding, every additional caller joins the same
//! future and observes the same eventual outcome. The slot is removed
//! unconditionally when the fetch settles, so a failed fetch never leaves
//! a permanently stuck slot. Producers run as spawned tasks and therefore
//! settle even if every waiter is dropped mid-await.
//!
//! Only foreground miss fetches go through this table; background
//! refreshes are never coalesced.

use crate::key::CacheKey;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// The producer task panicked before settling. Cloneable so every waiter
/// of the flight can observe it.
#[derive(Debug, Clone)]
pub(crate) struct Panicked(pub String);

/// A joinable in-flight fetch. Awaiting a clone yields the same outcome
/// the original producer settled with.
pub(crate) type Flight<T> = Shared<BoxFuture<'static, Result<T, Panicked>>>;

type PendingTable<T> = Arc<Mutex<HashMap<CacheKey, Flight<T>>>>;

/// Table of outstanding foreground fetches, keyed by cache key.
///
/// `T` must be `Sync` as well as `Send`: the settled outcome lives in the
/// shared flight and is read from every waiter's task.
pub(crate) struct RequestCoalescer<T: Clone + Send + Sync + 'static> {
    pending: PendingTable<T>,
}

impl<T: Clone + Send + Sync + 'static> fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Clone for RequestCoalescer<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Join the fetch already in flight for `key`, if any.
    pub fn join_existing(&self, key: &CacheKey) -> Option<Flight<T>> {
        self.pending.lock().unwrap().get(key).cloned()
    }

    /// Join the in-flight fetch for `key`, or start `producer` as a new
    /// one. Returns the flight plus whether this caller started it.
    pub fn run<F, Fut>(&self, key: &CacheKey, producer: F) -> (Flight<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap();
        if let Some(existing) = pending.get(key) {
            return (existing.clone(), false);
        }

        // The guard travels into the task so the slot is freed when the
        // producer settles for any reason, panic and unwind included. The
        // task cannot reach the table before we insert below: removal
        // needs the lock this scope still holds.
        let guard = Unregister {
            pending: Arc::clone(&self.pending),
            key: key.clone(),
        };
        let fut = producer();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            fut.await
        });
        let flight: Flight<T> = async move { handle.await.map_err(|e| Panicked(e.to_string())) }
            .boxed()
            .shared();

        pending.insert(key.clone(), flight.clone());
        (flight, true)
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Frees the pending slot on settle.
struct Unregister<T: Clone + Send + Sync + 'static> {
    pending: PendingTable<T>,
    key: CacheKey,
}

impl<T: Clone + Send + Sync + 'static> Drop for Unregister<T> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.key);
        }
    }
}
