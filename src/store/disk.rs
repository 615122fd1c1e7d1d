//! Disk-backed store.

use super::DurableStore;
use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// On-disk record: the entry plus the key it was stored under, so
/// `keys()` can recover the original strings from the hashed filenames.
#[derive(Serialize, Deserialize)]
struct Envelope {
    key: CacheKey,
    entry: CacheEntry,
}

/// One JSON file per key under a root directory.
///
/// The filename is the hex SHA-256 of the key. Writes land in a `.tmp`
/// sibling first and are renamed into place, so a crash mid-write leaves
/// either the old entry or no entry, never a torn one. Files that stop
/// parsing are deleted on the next read and reported as misses.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (and create if needed) the store rooted at `root`.
    ///
    /// Failure here is the signal for the engine to run uncached; see
    /// `HttpCacheBuilder::with_opened_store`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory the entries live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_str().as_bytes());
        let digest: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        self.root.join(format!("{digest}.json"))
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove entry file");
            }
        }
    }
}

#[async_trait]
impl DurableStore for DiskStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => Ok(Some(envelope.entry)),
            Err(e) => {
                debug!(key = %key, error = %e, "dropping unreadable entry file");
                self.discard(&path).await;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let envelope = Envelope {
            key: key.clone(),
            entry: entry.clone(),
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, &bytes).await {
            self.discard(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            self.discard(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(dirent) = dir.next_entry().await? {
            let path = dirent.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<Envelope>(&bytes) {
                    Ok(envelope) => keys.push(envelope.key),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "dropping unreadable entry file");
                        self.discard(&path).await;
                    }
                },
                // Raced with a concurrent delete; the key is simply gone.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut count = 0;
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(dirent) = dir.next_entry().await? {
            if dirent.path().extension().and_then(|ext| ext.to_str()) == Some("json") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
