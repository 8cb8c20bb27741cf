//! Daily cap enforcement for HIGH-priority task rewards.

use questline_config::RewardConfig;
use questline_store::{RewardStore, StoreError};
use questline_types::{EventKind, Timestamp, UserId};

/// What the cap decided for a proposed reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CapDecision {
    /// The reward fits; possibly clamped to the remaining headroom.
    Allow(u64),
    /// Nothing remains today; the whole operation becomes a no-op.
    Exhausted,
}

/// Clamps a HIGH-priority task reward against today's spent cap.
///
/// Aggregates today's `TaskCompleteHigh` deltas from the ledger (the entries
/// the cap itself tagged on previous commits, which is what keeps the
/// aggregate self-consistent) and clamps the proposed reward to what
/// remains.
pub(crate) fn clamp_high_reward<S: RewardStore>(
    store: &S,
    config: &RewardConfig,
    user_id: &UserId,
    reward: u64,
    now: Timestamp,
) -> Result<CapDecision, StoreError> {
    let used = store.sum_since(user_id, EventKind::TaskCompleteHigh, now.day_start())?;
    let remaining = config.daily_high_cap - used;

    if remaining <= 0 {
        return Ok(CapDecision::Exhausted);
    }

    Ok(CapDecision::Allow(reward.min(remaining as u64)))
}
