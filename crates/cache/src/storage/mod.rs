//! Reference implementations of the size-bounded [`Store`] primitive
//!
//! [`Store`]: fragcache_core::Store

mod disk;
mod memory;
mod paths;

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// Default per-entry ceiling of the reference stores (2 MiB)
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 2 * 1024 * 1024;
