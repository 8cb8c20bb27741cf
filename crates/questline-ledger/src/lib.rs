//! # questline-ledger: Reward orchestration core
//!
//! Composes the rule registry, configuration store, daily cap enforcer, and
//! reward store into one atomic operation per external event. External
//! triggers (task completed, login, score submitted, achievement claimed,
//! item purchased, admin grant) enter through [`RewardLedger`]; everything
//! that mutates points leaves exactly one immutable ledger row behind.
//!
//! ## Consistency model
//!
//! Reward computation (rule evaluation, config reads, cap aggregation) runs
//! outside any transaction and is safely repeatable. The only atomic phase
//! is the store commit: idempotency-token check plus version-conditional
//! balance update. Conflicts surface as a bounded retry loop, never as
//! waiting; duplicates surface as a no-op success, never as an error.

mod cap;
mod catalog;
mod clock;
mod orchestrator;

pub use catalog::{
    AchievementCatalog, MemoryAchievementCatalog, MemoryShopCatalog, ShopCatalog,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use orchestrator::RewardLedger;

use questline_config::ConfigError;
use questline_store::StoreError;
use questline_types::{AchievementId, BalanceSnapshot, ItemId, UserId};

/// Maximum optimistic-lock attempts before an operation surfaces
/// [`LedgerError::Contention`].
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Errors surfaced to external triggers.
///
/// Duplicate submissions and cap exhaustion are deliberately absent: both
/// are [`Outcome`]s, not errors.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Unknown or hidden shop item.
    #[error("shop item {0} not found")]
    ItemNotFound(ItemId),

    /// Unknown or hidden achievement.
    #[error("achievement {0} not found")]
    AchievementNotFound(AchievementId),

    /// A debit would overdraw the balance. No mutation was performed.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: i64, need: i64 },

    /// The acting principal lacks the privilege for this operation.
    #[error("actor {0} is not permitted to perform this operation")]
    PermissionDenied(UserId),

    /// Optimistic-lock retries exhausted; the operation did not apply and
    /// can be retried by the caller.
    #[error("commit contention for user {user_id} after {attempts} attempts")]
    Contention { user_id: UserId, attempts: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a credit/debit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The ledger row and balance update committed.
    Applied(BalanceSnapshot),
    /// Nothing was written; the reason says why.
    Noop(NoopReason),
}

impl Outcome {
    /// The committed snapshot, if the operation applied.
    pub fn applied(&self) -> Option<BalanceSnapshot> {
        match self {
            Outcome::Applied(snapshot) => Some(*snapshot),
            Outcome::Noop(_) => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Outcome::Noop(_))
    }
}

/// Why an operation wrote nothing. All of these are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    /// No rule matched, or the matched rules summed to zero.
    ZeroReward,
    /// The daily cap for this category is already spent.
    CapExhausted,
    /// An entry with this idempotency token already exists; the action was
    /// credited or debited on a previous submission.
    AlreadyProcessed,
}
