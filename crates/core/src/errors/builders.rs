//! Builder methods for creating errors with context

use super::types::{BoxError, CacheError, RecoveryHint, SerializationOp};
use std::path::PathBuf;

impl CacheError {
    /// Create a store failure for a single key
    #[must_use]
    pub fn store(
        key: impl Into<String>,
        operation: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        CacheError::Store {
            key: key.into(),
            operation,
            source: source.into(),
            recovery_hint: RecoveryHint::TreatAsMiss,
        }
    }

    /// Create an entry-too-large error
    #[must_use]
    pub fn entry_too_large(key: impl Into<String>, size: usize, limit: usize) -> Self {
        CacheError::EntryTooLarge {
            key: key.into(),
            size,
            limit,
            recovery_hint: RecoveryHint::ReduceFragmentSize { max_bytes: limit },
        }
    }

    /// Create a decode error
    #[must_use]
    pub fn decode(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CacheError::Serialization {
            key: key.into(),
            operation: SerializationOp::Decode,
            source: source.into(),
            recovery_hint: RecoveryHint::TreatAsMiss,
        }
    }

    /// Create an encode error
    #[must_use]
    pub fn encode(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CacheError::Serialization {
            key: key.into(),
            operation: SerializationOp::Encode,
            source: source.into(),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check that the payload type serializes to JSON".to_string(),
            },
        }
    }

    /// Create a reassembly error
    #[must_use]
    pub fn reassembly(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::Reassembly {
            prefix: prefix.into(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::TreatAsMiss,
        }
    }

    /// Create an invalid key error
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::InvalidKey {
            key: key.into(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Use a non-empty key without NUL bytes, at most 1024 bytes"
                    .to_string(),
            },
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        CacheError::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }

    /// Wrap a producer failure
    #[must_use]
    pub fn producer(prefix: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CacheError::Producer {
            prefix: prefix.into(),
            source: source.into(),
            recovery_hint: RecoveryHint::Propagate,
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        CacheError::Io {
            recovery_hint: RecoveryHint::CheckPermissions { path: path.clone() },
            path,
            operation,
            source,
        }
    }
}
