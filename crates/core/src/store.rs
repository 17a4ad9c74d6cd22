//! Boundary to the external size-bounded cache primitive

use crate::errors::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A persistent key/value primitive with per-key expiry and a per-entry
/// size ceiling.
///
/// Every call stands alone: there is no multi-key transaction, and a key that
/// was never written, has expired, or was evicted all read back as `Ok(None)`.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Store `value` under `key`, expiring after `ttl`
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Fetch the value under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Largest value in bytes this store accepts, if it advertises one
    fn max_entry_bytes(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        (**self).put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    fn max_entry_bytes(&self) -> Option<usize> {
        (**self).max_entry_bytes()
    }
}
