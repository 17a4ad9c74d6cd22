//! File-system store: one JSON envelope per key, written atomically

use async_trait::async_trait;
use fragcache_core::{CacheError, Result, Store};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

use super::paths::object_path;
use super::DEFAULT_MAX_ENTRY_BYTES;

/// On-disk record for a single key
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    expires_at_ms: u64,
    value: String,
}

/// [`Store`] persisting entries under `base_dir/objects/<shard>/<sha256>`
#[derive(Debug, Clone)]
pub struct DiskStore {
    base_dir: PathBuf,
    max_entry_bytes: usize,
}

impl DiskStore {
    /// Create a store rooted at `base_dir` with the default 2 MiB ceiling
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_max_entry_bytes(base_dir, DEFAULT_MAX_ENTRY_BYTES)
    }

    pub fn with_max_entry_bytes(base_dir: impl Into<PathBuf>, max_entry_bytes: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_entry_bytes,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Delete the entry for `key`, returning whether a file was removed
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let path = object_path(&self.base_dir, key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, "remove cache entry", e)),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(millis)
        .unwrap_or(0)
}

/// Milliseconds in `duration`, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl Store for DiskStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if value.len() > self.max_entry_bytes {
            return Err(CacheError::entry_too_large(
                key,
                value.len(),
                self.max_entry_bytes,
            ));
        }

        let path = object_path(&self.base_dir, key);
        let parent = path
            .parent()
            .ok_or_else(|| CacheError::configuration("Invalid cache path"))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, "create cache directory", e))?;

        let envelope = Envelope {
            key: key.to_string(),
            expires_at_ms: now_ms().saturating_add(millis(ttl)),
            value,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| CacheError::encode(key, e))?;

        // Write to a unique temp file then rename so readers never see a torn entry
        let temp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&temp_path, &bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(temp_path, "write cache entry", e));
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(path, "rename cache entry", e));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = object_path(&self.base_dir, key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, "read cache entry", e)),
        };

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                let _ = fs::remove_file(&path).await;
                return Ok(None);
            }
        };

        // The file is a live entry of another key hashing to the same path, so it stays
        if envelope.key != key {
            tracing::warn!(key, stored = %envelope.key, "Cache entry key mismatch");
            return Ok(None);
        }

        if envelope.expires_at_ms <= now_ms() {
            let _ = fs::remove_file(&path).await;
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    fn max_entry_bytes(&self) -> Option<usize> {
        Some(self.max_entry_bytes)
    }
}
