//! In-memory store.

use super::DurableStore;
use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use tracing::debug;

/// Bounded in-process store holding serialized entries.
///
/// Entries are kept as serialized bytes rather than live values, so the
/// read path exercises the same deserialize-or-discard behavior the disk
/// backend has. When the capacity is reached the least recently touched
/// entry is evicted.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, Vec<u8>>>,
}

impl MemoryStore {
    /// A store bounded to `capacity` entries (clamped to at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let bytes = {
            let mut entries = self.entries.write().unwrap();
            entries.get(key.as_str()).cloned()
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                debug!(key = %key, error = %e, "dropping unreadable entry");
                self.entries.write().unwrap().pop(key.as_str());
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        self.entries
            .write()
            .unwrap()
            .put(key.as_str().to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().unwrap().pop(key.as_str()).is_some())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .map(|(key, _)| CacheKey::from(key.clone()))
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().unwrap().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
