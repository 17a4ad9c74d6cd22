//! Core types and errors for fragcache.
//!
//! - **`errors`**: the `CacheError` enum and `Result` alias shared by every
//!   layer, each variant carrying a `RecoveryHint`.
//! - **`keys`**: key validation and the deterministic derivation of metadata
//!   and fragment keys from a prefix.
//! - **`store`**: the `Store` trait, the boundary to the external
//!   size-bounded cache primitive.

pub mod errors;
pub mod keys;
pub mod store;

pub use self::{
    errors::{BoxError, CacheError, RecoveryHint, Result, SerializationOp},
    keys::{
        fragment_key, fragment_keys, metadata_key, validate_prefix, CacheKey, MAX_KEY_BYTES,
        MAX_PREFIX_BYTES,
    },
    store::Store,
};
