//! Cache key validation and derivation

use crate::errors::{CacheError, Result};

/// Longest key accepted by [`CacheKey::validate`]
pub const MAX_KEY_BYTES: usize = 1024;

/// Suffix appended to a prefix to address its metadata record
pub const METADATA_SUFFIX: &str = "metadata";

/// Longest prefix whose derived keys all stay within [`MAX_KEY_BYTES`]
///
/// `prefix:metadata` is the longest derived key while fragment indices have
/// fewer digits than [`METADATA_SUFFIX`].
pub const MAX_PREFIX_BYTES: usize = MAX_KEY_BYTES - METADATA_SUFFIX.len() - 1;

/// Cache key validation
pub trait CacheKey: AsRef<str> {
    /// Validate that this is a valid cache key
    fn validate(&self) -> Result<()> {
        let key = self.as_ref();

        if key.is_empty() {
            return Err(CacheError::invalid_key(key, "Key cannot be empty"));
        }

        if key.len() > MAX_KEY_BYTES {
            return Err(CacheError::invalid_key(
                truncated(key),
                format!("Key exceeds maximum length of {MAX_KEY_BYTES} bytes"),
            ));
        }

        if key.contains('\0') {
            return Err(CacheError::invalid_key(key, "Key contains null bytes"));
        }

        Ok(())
    }
}

impl CacheKey for str {}
impl CacheKey for String {}

/// First 50 bytes of a long key, cut on a char boundary, for error messages
fn truncated(key: &str) -> String {
    let mut end = 50.min(key.len());
    while !key.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &key[..end])
}

/// Validate a prefix so that every key derived from it is itself valid
pub fn validate_prefix(prefix: &str) -> Result<()> {
    prefix.validate()?;
    if prefix.len() > MAX_PREFIX_BYTES {
        return Err(CacheError::invalid_key(
            truncated(prefix),
            format!("Prefix exceeds maximum length of {MAX_PREFIX_BYTES} bytes"),
        ));
    }
    Ok(())
}

/// Key of the metadata record for `prefix`
#[must_use]
pub fn metadata_key(prefix: &str) -> String {
    format!("{prefix}:{METADATA_SUFFIX}")
}

/// Key of fragment `index` for `prefix`
#[must_use]
pub fn fragment_key(prefix: &str, index: usize) -> String {
    format!("{prefix}:{index}")
}

/// Ordered fragment keys `0..count` for `prefix`
#[must_use]
pub fn fragment_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|index| fragment_key(prefix, index)).collect()
}
