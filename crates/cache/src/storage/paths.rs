//! Sharded on-disk layout for [`DiskStore`](super::DiskStore)

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Hash a cache key into a file-system safe name
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Path of the entry for `key`, sharded 256 ways on the first hash byte
pub fn object_path(base_dir: &Path, key: &str) -> PathBuf {
    let hash = hash_key(key);
    base_dir.join("objects").join(&hash[..2]).join(hash)
}
