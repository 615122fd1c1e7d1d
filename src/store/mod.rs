//! Durable key→entry stores.
//!
//! The engine persists serialized [`CacheEntry`] values through the
//! [`DurableStore`] trait. Two backends ship with the crate:
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`MemoryStore`] | Bounded in-process LRU, serialized entries |
//! | [`DiskStore`] | One JSON file per key, survives restarts |
//!
//! Stores know nothing about freshness; they hand entries back as
//! written and the engine decides what is still servable. The one
//! self-healing behavior they do own: an entry that no longer
//! deserializes is removed on the spot and reported as a miss.
//!
//! ```rust
//! use readthrough::store::MemoryStore;
//!
//! // Bounded to 512 entries, oldest evicted first.
//! let store = MemoryStore::new(512);
//! ```

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::Result;
use async_trait::async_trait;

/// Async persistence contract for cache entries.
///
/// Every operation is individually fallible and atomic per key; no
/// cross-key transaction exists and none is needed by the engine.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetch the entry stored under `key`, `None` on a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Write or overwrite the entry under `key`.
    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;

    /// Remove the entry under `key`; `true` when something was removed.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Every stored key, in no particular order.
    async fn keys(&self) -> Result<Vec<CacheKey>>;

    /// Drop all entries.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Short backend identifier for logs.
    fn name(&self) -> &'static str;
}
