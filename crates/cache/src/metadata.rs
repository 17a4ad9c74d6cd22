//! Fragment-count records stored alongside each prefix

use crate::adapter::StoreAdapter;
use crate::serialization::{decode, encode};
use fragcache_core::{metadata_key, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest fragment count a record may claim
///
/// Records come from the store and are not trusted; a larger count reads as
/// absent rather than sizing the fragment fan-out.
pub const MAX_FRAGMENT_COUNT: usize = 65_536;

/// How many fragments were written for a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    pub fragment_count: usize,
}

/// Reads and writes [`FragmentMetadata`] under `prefix:metadata`
#[derive(Debug, Clone)]
pub struct MetadataManager {
    adapter: StoreAdapter,
}

impl MetadataManager {
    pub fn new(adapter: StoreAdapter) -> Self {
        Self { adapter }
    }

    /// Record `fragment_count` for `prefix`
    pub async fn store_meta(&self, prefix: &str, fragment_count: usize, ttl: Duration) -> Result<()> {
        let key = metadata_key(prefix);
        let text = encode(&key, &FragmentMetadata { fragment_count })?;
        self.adapter.put(&key, text, ttl).await
    }

    /// Load the record for `prefix`
    ///
    /// Store failures and unreadable records are reported as `None`.
    pub async fn load_meta(&self, prefix: &str) -> Option<FragmentMetadata> {
        let key = metadata_key(prefix);
        let text = match self.adapter.get(&key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(prefix, error = %e, "Failed to read fragment metadata");
                return None;
            }
        };

        match decode::<FragmentMetadata>(&key, &text) {
            Ok(meta) if meta.fragment_count > MAX_FRAGMENT_COUNT => {
                tracing::warn!(
                    prefix,
                    fragment_count = meta.fragment_count,
                    limit = MAX_FRAGMENT_COUNT,
                    "Discarding fragment metadata with implausible count"
                );
                None
            }
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(prefix, error = %e, "Discarding unreadable fragment metadata");
                None
            }
        }
    }
}
