//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Store { recovery_hint, .. }
            | Self::EntryTooLarge { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Reassembly { recovery_hint, .. }
            | Self::InvalidKey { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. }
            | Self::Producer { recovery_hint, .. }
            | Self::Io { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Whether the orchestrator absorbs this error as a cache miss
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(
            self,
            Self::Store { .. }
                | Self::EntryTooLarge { .. }
                | Self::Serialization { .. }
                | Self::Reassembly { .. }
                | Self::Io { .. }
        )
    }

    /// Check if this error came from the caller's producer
    #[must_use]
    pub const fn is_producer_failure(&self) -> bool {
        matches!(self, Self::Producer { .. })
    }
}
