//! Chunked read-through cache over a size-bounded store
//!
//! A payload is encoded, split into fragments no larger than the configured
//! bound and written as `prefix:0 .. prefix:n-1`, with `prefix:metadata`
//! recording `n`. Entries expire independently, so a read treats any missing
//! or undecodable fragment as a miss for the whole prefix and regenerates the
//! value from the producer.

use crate::adapter::StoreAdapter;
use crate::chunking::{reassemble, split};
use crate::config::ChunkedCacheConfig;
use crate::metadata::{MetadataManager, MAX_FRAGMENT_COUNT};
use crate::producer::Producer;
use crate::serialization::{decode, encode};
use crate::stats::{CacheStats, ChunkedCacheStatistics};
use fragcache_core::{fragment_keys, validate_prefix, CacheError, Result, Store};
use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Read-through cache for one prefix
///
/// Clones share the same store, producer and counters.
pub struct ChunkedCache<T> {
    inner: Arc<CacheInner<T>>,
}

struct CacheInner<T> {
    prefix: String,
    config: ChunkedCacheConfig,
    adapter: StoreAdapter,
    metadata: MetadataManager,
    producer: Box<dyn Producer<T>>,
    stats: CacheStats,
    /// Held across the miss path when single-flight is enabled
    flight: Option<Mutex<()>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for ChunkedCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ChunkedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedCache")
            .field("prefix", &self.inner.prefix)
            .field("config", &self.inner.config)
            .field("adapter", &self.inner.adapter)
            .finish()
    }
}

impl<T> ChunkedCache<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Create a cache for `prefix` with the default configuration
    /// (one hour revalidation, 1 MiB fragments)
    pub fn new<S, P>(prefix: impl Into<String>, store: S, producer: P) -> Result<Self>
    where
        S: Store + 'static,
        P: Producer<T> + 'static,
    {
        ChunkedCacheBuilder::new(prefix).build(store, producer)
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub fn config(&self) -> &ChunkedCacheConfig {
        &self.inner.config
    }

    /// Snapshot of this cache's counters
    pub fn statistics(&self) -> ChunkedCacheStatistics {
        self.inner.stats.snapshot()
    }

    /// Return the cached payload, or produce, store and return a fresh one
    ///
    /// Store failures never fail this call. Producer failures are returned
    /// as [`CacheError::Producer`].
    pub async fn get(&self) -> Result<T> {
        if let Some(value) = self.read_cached().await {
            return Ok(value);
        }

        match &self.inner.flight {
            Some(flight) => {
                let _guard = flight.lock().await;
                // Another caller may have stored the value while we waited
                if let Some(value) = self.read_cached().await {
                    return Ok(value);
                }
                self.refresh().await
            }
            None => self.refresh().await,
        }
    }

    /// Try to rebuild the payload from the store
    async fn read_cached(&self) -> Option<T> {
        let inner = &self.inner;
        let meta = inner.metadata.load_meta(&inner.prefix).await?;

        let keys = fragment_keys(&inner.prefix, meta.fragment_count);
        let results = join_all(keys.iter().map(|key| inner.adapter.get(key))).await;

        match self.assemble(results) {
            Ok(value) => {
                inner.stats.record_hit();
                tracing::debug!(
                    prefix = %inner.prefix,
                    fragment_count = meta.fragment_count,
                    "Chunked cache hit"
                );
                Some(value)
            }
            Err(e) => {
                inner.stats.record_partial_miss();
                tracing::warn!(
                    prefix = %inner.prefix,
                    fragment_count = meta.fragment_count,
                    error = %e,
                    "Cached fragments unusable, regenerating"
                );
                None
            }
        }
    }

    /// Combine fragment reads, in key order, into a payload
    fn assemble(&self, results: Vec<Result<Option<String>>>) -> Result<T> {
        let prefix = &self.inner.prefix;
        if results.is_empty() {
            return Err(CacheError::reassembly(prefix, "metadata records no fragments"));
        }

        let mut fragments = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result? {
                Some(fragment) => fragments.push(fragment),
                None => {
                    return Err(CacheError::reassembly(
                        prefix,
                        format!("fragment {index} is missing"),
                    ))
                }
            }
        }

        decode(prefix, &reassemble(&fragments))
    }

    /// Miss path: produce, store back, return
    async fn refresh(&self) -> Result<T> {
        let inner = &self.inner;
        inner.stats.record_miss();
        inner.stats.record_producer_call();
        tracing::debug!(prefix = %inner.prefix, "Chunked cache miss, calling producer");

        let value = match inner.producer.produce().await {
            Ok(value) => value,
            Err(e) => {
                inner.stats.record_producer_failure();
                return Err(CacheError::producer(&inner.prefix, e));
            }
        };

        let encoded = encode(&inner.prefix, &value);
        self.store_back(encoded).await;
        Ok(value)
    }

    /// Write metadata and every fragment concurrently; failures are logged only
    async fn store_back(&self, encoded: Result<String>) {
        let inner = &self.inner;
        let prefix = inner.prefix.as_str();
        let ttl = inner.config.revalidate;

        let text = match encoded {
            Ok(text) => text,
            Err(e) => {
                inner.stats.record_write_failures(1);
                tracing::warn!(prefix, error = %e, "Skipping store-back, payload did not encode");
                return;
            }
        };
        let fragments = match split(&text, inner.config.max_fragment_bytes) {
            Ok(fragments) => fragments,
            Err(e) => {
                inner.stats.record_write_failures(1);
                tracing::warn!(prefix, error = %e, "Skipping store-back, payload did not split");
                return;
            }
        };
        if fragments.len() > MAX_FRAGMENT_COUNT {
            inner.stats.record_write_failures(1);
            tracing::warn!(
                prefix,
                fragment_count = fragments.len(),
                limit = MAX_FRAGMENT_COUNT,
                "Skipping store-back, payload needs too many fragments"
            );
            return;
        }

        let keys = fragment_keys(prefix, fragments.len());
        let fragment_writes = keys
            .iter()
            .zip(&fragments)
            .map(|(key, fragment)| inner.adapter.put(key, (*fragment).to_string(), ttl));
        let meta_write = inner.metadata.store_meta(prefix, fragments.len(), ttl);

        let (meta_result, fragment_results) =
            futures::join!(meta_write, join_all(fragment_writes));

        let mut failures = 0u64;
        if let Err(e) = meta_result {
            failures += 1;
            tracing::warn!(prefix, error = %e, "Failed to write fragment metadata");
        }
        let mut written = 0u64;
        for (key, result) in keys.iter().zip(fragment_results) {
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(prefix, key = %key, error = %e, "Failed to write fragment");
                }
            }
        }

        inner.stats.record_fragments_written(written);
        if failures > 0 {
            inner.stats.record_write_failures(failures);
        }
        tracing::debug!(
            prefix,
            fragment_count = fragments.len(),
            bytes = text.len(),
            failures,
            "Stored payload fragments"
        );
    }
}

/// Builder for [`ChunkedCache`]
#[derive(Debug, Clone)]
pub struct ChunkedCacheBuilder {
    prefix: String,
    config: ChunkedCacheConfig,
}

impl ChunkedCacheBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            config: ChunkedCacheConfig::default(),
        }
    }

    /// Replace the whole configuration, e.g. one produced by
    /// [`ChunkedCacheConfigLoader`](crate::ChunkedCacheConfigLoader)
    pub fn with_config(mut self, config: ChunkedCacheConfig) -> Self {
        self.config = config;
        self
    }

    /// TTL of every write
    pub fn with_revalidate(mut self, revalidate: Duration) -> Self {
        self.config.revalidate = revalidate;
        self
    }

    pub fn with_max_fragment_bytes(mut self, max_fragment_bytes: usize) -> Self {
        self.config.max_fragment_bytes = max_fragment_bytes;
        self
    }

    pub fn with_single_flight(mut self, single_flight: bool) -> Self {
        self.config.single_flight = single_flight;
        self
    }

    /// Validate the prefix and configuration and build the cache
    pub fn build<T, S, P>(self, store: S, producer: P) -> Result<ChunkedCache<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        S: Store + 'static,
        P: Producer<T> + 'static,
    {
        validate_prefix(&self.prefix)?;
        self.config.validate(store.max_entry_bytes())?;

        let adapter = StoreAdapter::new(Arc::new(store));
        let flight = self.config.single_flight.then(|| Mutex::new(()));

        Ok(ChunkedCache {
            inner: Arc::new(CacheInner {
                prefix: self.prefix,
                config: self.config,
                metadata: MetadataManager::new(adapter.clone()),
                adapter,
                producer: Box::new(producer),
                stats: CacheStats::default(),
                flight,
                _payload: PhantomData,
            }),
        })
    }
}
