//! The in-process configuration cache.

use crate::RewardConfig;

/// Explicit cache slot for the configuration document.
///
/// Owned by the [`ConfigStore`](crate::ConfigStore) and invalidated
/// unconditionally after every successful write. The cache is per-process:
/// in a multi-process deployment other readers may observe a stale value for
/// a bounded window after a remote update.
#[derive(Debug, Default)]
pub struct ConfigCache {
    slot: Option<Cached>,
}

#[derive(Debug)]
struct Cached {
    value: RewardConfig,
    source_version: u64,
}

impl ConfigCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document and the row version it was loaded from.
    pub fn get(&self) -> Option<(&RewardConfig, u64)> {
        self.slot
            .as_ref()
            .map(|cached| (&cached.value, cached.source_version))
    }

    /// Replaces the cached value.
    pub fn fill(&mut self, value: RewardConfig, source_version: u64) {
        self.slot = Some(Cached {
            value,
            source_version,
        });
    }

    /// Drops the cached value; the next read goes to the backend.
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// True when no value is cached.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
