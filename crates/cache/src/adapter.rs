//! Thin façade over the external [`Store`]

use fragcache_core::{CacheKey, Result, Store};
use std::sync::Arc;
use std::time::Duration;

/// Single entry point through which the cache talks to its store
///
/// Every call is independent and is never retried here.
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    store: Arc<dyn Store>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Write `value` under `key` with the given time-to-live
    pub async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        key.validate()?;
        let size = value.len();
        match self.store.put(key, value, ttl).await {
            Ok(()) => {
                tracing::trace!(key, size, "Stored cache entry");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(key, size, error = %e, "Store rejected cache entry");
                Err(e)
            }
        }
    }

    /// Read the value under `key`
    ///
    /// Never-written, expired and evicted keys all return `Ok(None)`.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        key.validate()?;
        match self.store.get(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Store read failed");
                Err(e)
            }
        }
    }

    /// Entry ceiling advertised by the underlying store
    pub fn max_entry_bytes(&self) -> Option<usize> {
        self.store.max_entry_bytes()
    }
}
