//! Canonical text encoding for cached payloads
//!
//! Payloads are encoded as compact JSON. Encoding is deterministic for any
//! value whose `Serialize` impl is (structs, sequences, `BTreeMap`), which is
//! what lets fragments written at different times concatenate back to the
//! same text.

use fragcache_core::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a payload to its canonical text form
pub fn encode<T>(key: &str, value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(|e| CacheError::encode(key, e))
}

/// Decode canonical text back into a payload
///
/// Truncated, reordered or corrupted text fails with
/// [`CacheError::Serialization`].
pub fn decode<T>(key: &str, text: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str(text).map_err(|e| CacheError::decode(key, e))
}
