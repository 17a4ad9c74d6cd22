//! In-process store with per-key expiry and an entry size ceiling

use async_trait::async_trait;
use dashmap::DashMap;
use fragcache_core::{CacheError, Result, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::DEFAULT_MAX_ENTRY_BYTES;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// `DashMap`-backed [`Store`]
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
    max_entry_bytes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with the default 2 MiB entry ceiling
    pub fn new() -> Self {
        Self::with_max_entry_bytes(DEFAULT_MAX_ENTRY_BYTES)
    }

    /// Create an empty store that rejects values above `max_entry_bytes`
    pub fn with_max_entry_bytes(max_entry_bytes: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entry_bytes,
        }
    }

    /// Drop `key`, returning whether it was present
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of stored entries, expired ones included until next read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite the raw value under `key` keeping its expiry
    ///
    /// Returns `false` when the key is absent.
    pub fn corrupt(&self, key: &str, value: impl Into<String>) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if value.len() > self.max_entry_bytes {
            return Err(CacheError::entry_too_large(
                key,
                value.len(),
                self.max_entry_bytes,
            ));
        }

        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        // A concurrent put may have refreshed the key since the check above
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    fn max_entry_bytes(&self) -> Option<usize> {
        Some(self.max_entry_bytes)
    }
}
