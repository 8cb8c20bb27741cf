//! # questline-store: Balance and ledger storage
//!
//! The only shared mutable resource in the system is the store holding user
//! balances and the append-only points ledger. This crate defines the seam
//! ([`RewardStore`]) and the in-memory reference implementation
//! ([`MemoryStore`]).
//!
//! Mutual exclusion is achieved purely through the store's semantics, never
//! through locks held by callers:
//! - the balance row carries an optimistic-lock `version`; [`commit`]
//!   applies the conditional update `... WHERE version = expected` and
//!   signals [`CommitError::VersionConflict`] when a concurrent writer won;
//! - the ledger enforces at most one entry per idempotency token and signals
//!   [`CommitError::DuplicateToken`] on a race inside the critical section.
//!
//! The ledger append and the balance update commit atomically: either both
//! land or neither does.
//!
//! [`commit`]: RewardStore::commit

mod memory;

pub use memory::MemoryStore;

use questline_types::{EventKind, IdempotencyToken, LedgerEntry, Timestamp, UserBalance, UserId};

/// Errors from plain reads and user creation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("user {0} already exists")]
    UserAlreadyExists(UserId),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from the atomic commit phase.
#[derive(thiserror::Error, Debug)]
pub enum CommitError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// An entry with this token already exists; the action was already
    /// applied. Not a failure from the caller's perspective.
    #[error("ledger already contains an entry for token {0}")]
    DuplicateToken(IdempotencyToken),

    /// A concurrent writer advanced the balance version first. The caller
    /// retries from a fresh read.
    #[error("version conflict for user {user_id}: expected {expected}, actual {actual}")]
    VersionConflict {
        user_id: UserId,
        expected: u64,
        actual: u64,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// The store holding user balances and the append-only points ledger.
///
/// Reads are safely repeatable and happen outside any transaction; only
/// [`commit`](Self::commit) is atomic.
pub trait RewardStore: Send + Sync {
    // ========================================================================
    // Balance records
    // ========================================================================

    /// Seeds a balance record at account creation
    /// (`points=0, level=1, version=1`).
    fn create_user(&self, user_id: UserId) -> Result<UserBalance, StoreError>;

    /// Current balance record, or `None` for an unknown user.
    fn balance(&self, user_id: &UserId) -> Result<Option<UserBalance>, StoreError>;

    // ========================================================================
    // Ledger reads
    // ========================================================================

    /// True if any ledger entry carries this idempotency token.
    fn contains_token(&self, token: &IdempotencyToken) -> Result<bool, StoreError>;

    /// Sum of `points_delta` for one user and kind since a timestamp
    /// (inclusive). Used by the daily cap enforcer.
    fn sum_since(
        &self,
        user_id: &UserId,
        kind: EventKind,
        since: Timestamp,
    ) -> Result<i64, StoreError>;

    /// All ledger entries for a user, oldest first. Audit read.
    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, StoreError>;

    // ========================================================================
    // Atomic commit
    // ========================================================================

    /// Atomically appends the ledger entry and applies the conditional
    /// balance update:
    ///
    /// ```text
    /// points += entry.points_delta, level = new_level, version += 1
    ///     WHERE user = entry.user_id AND version = expected_version
    /// ```
    ///
    /// Returns the updated balance record. The entry and the balance update
    /// commit together or not at all. `new_level` is computed by the caller
    /// from the configuration, since the store knows nothing about level
    /// thresholds.
    fn commit(
        &self,
        entry: LedgerEntry,
        expected_version: u64,
        new_level: u32,
    ) -> Result<UserBalance, CommitError>;
}
