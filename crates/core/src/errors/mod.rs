//! Error types for fragcache operations

mod builders;
mod recovery;
mod types;

pub use types::{BoxError, CacheError, RecoveryHint, Result, SerializationOp};
