//! Chunked caching of large payloads over a size-bounded store
//!
//! The store accepts only entries below a fixed size, so payloads are encoded,
//! split into bounded fragments and tracked by a separate metadata record.
//! Reads fetch every fragment concurrently and fall back to a producer when
//! anything is missing or corrupt.
//!
//! # Example
//! ```no_run
//! use fragcache::{ChunkedCache, MemoryStore};
//!
//! # async fn example() -> fragcache::Result<()> {
//! let cache: ChunkedCache<Vec<String>> = ChunkedCache::new(
//!     "posts",
//!     MemoryStore::new(),
//!     || async { Ok::<_, std::io::Error>(vec!["hello".to_string()]) },
//! )?;
//!
//! let posts = cache.get().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod chunking;
pub mod config;
pub mod metadata;
pub mod orchestrator;
pub mod producer;
pub mod serialization;
pub mod storage;

mod stats;

pub use adapter::StoreAdapter;
pub use config::{
    ChunkedCacheConfig, ChunkedCacheConfigLoader, ConfigSource, LoadedConfig, PartialConfig,
};
pub use metadata::{FragmentMetadata, MetadataManager, MAX_FRAGMENT_COUNT};
pub use orchestrator::{ChunkedCache, ChunkedCacheBuilder};
pub use producer::Producer;
pub use stats::ChunkedCacheStatistics;
pub use storage::{DiskStore, MemoryStore};

pub use fragcache_core::{
    fragment_key, fragment_keys, metadata_key, validate_prefix, BoxError, CacheError, CacheKey,
    RecoveryHint, Result, SerializationOp, Store, MAX_PREFIX_BYTES,
};
