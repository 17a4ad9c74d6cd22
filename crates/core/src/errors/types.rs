use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for fragcache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Boxed error used for opaque sources (store backends, producers)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for chunked cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store reported a failure for a single call
    #[error("store {operation} failed for key '{key}': {source}")]
    Store {
        key: String,
        operation: &'static str,
        #[source]
        source: BoxError,
        recovery_hint: RecoveryHint,
    },

    /// The backing store refused a value above its per-entry ceiling
    #[error("entry '{key}' is {size} bytes, store accepts at most {limit} bytes")]
    EntryTooLarge {
        key: String,
        size: usize,
        limit: usize,
        recovery_hint: RecoveryHint,
    },

    /// Encoding or decoding of a payload failed
    #[error("failed to {operation} cache entry '{key}': {source}")]
    Serialization {
        key: String,
        operation: SerializationOp,
        #[source]
        source: BoxError,
        recovery_hint: RecoveryHint,
    },

    /// Fragments were missing or did not form a complete encoding
    #[error("cannot reassemble '{prefix}': {reason}")]
    Reassembly {
        prefix: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Invalid cache key or prefix
    #[error("invalid cache key '{key}': {reason}")]
    InvalidKey {
        key: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },

    /// The caller-supplied producer failed
    #[error("producer for '{prefix}' failed: {source}")]
    Producer {
        prefix: String,
        #[source]
        source: BoxError,
        recovery_hint: RecoveryHint,
    },

    /// File system operations
    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryHint {
    /// Retry the operation after a delay
    Retry { after: Duration },

    /// Treat the prefix as a cache miss and regenerate the value
    TreatAsMiss,

    /// Lower the fragment size bound below the store ceiling
    ReduceFragmentSize { max_bytes: usize },

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Update cache configuration
    UpdateConfiguration,

    /// No automated recovery possible
    Manual { instructions: String },

    /// Nothing can be done inside the cache; the caller owns the failure
    Propagate,
}

/// Serialization operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationOp {
    Encode,
    Decode,
}

impl std::fmt::Display for SerializationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode => f.write_str("encode"),
            Self::Decode => f.write_str("decode"),
        }
    }
}
