//! # questline-config: Versioned reward-rule configuration
//!
//! Holds the single admin-tunable configuration document that drives reward
//! calculation: the priority→XP table, the level thresholds, the daily high
//! cap, and the on-time bonus formula.
//!
//! The document is a singleton row, lazily seeded with built-in defaults on
//! first read and replaced wholesale on admin writes. Reads go through an
//! explicit in-memory [`ConfigCache`] owned by the [`ConfigStore`]; every
//! successful write bumps the row version and unconditionally invalidates
//! the cache.
//!
//! The level math ([`RewardConfig::level_for`],
//! [`RewardConfig::level_progress`]) lives on the document itself: it is
//! pure, and rules receive the document explicitly rather than fetching it.

mod cache;
mod document;
mod store;

pub use cache::ConfigCache;
pub use document::{LevelProgress, OnTimeBonus, RewardConfig, XpByPriority};
pub use store::{ConfigBackend, ConfigRecord, ConfigStore, MemoryConfigBackend};

/// Errors from configuration reads and writes.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The submitted document is malformed; nothing was written.
    #[error("invalid reward configuration: {reason}")]
    Validation { reason: String },

    /// The backing store failed.
    #[error("configuration backend error: {0}")]
    Backend(String),
}
