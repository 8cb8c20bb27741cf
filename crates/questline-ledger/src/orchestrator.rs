//! The reward orchestrator: composes rules, config, cap, and store into one
//! atomic operation per external event.

use questline_config::{ConfigBackend, ConfigStore, LevelProgress, RewardConfig};
use questline_rules::RuleRegistry;
use questline_store::{CommitError, RewardStore, StoreError};
use questline_types::{
    AchievementId, Actor, BalanceSnapshot, EventKind, IdempotencyToken, ItemId, LedgerEntry,
    RewardEvent, UserBalance, UserId,
};

use crate::cap::{self, CapDecision};
use crate::catalog::{AchievementCatalog, ShopCatalog};
use crate::clock::{Clock, SystemClock};
use crate::{LedgerError, MAX_COMMIT_ATTEMPTS, NoopReason, Outcome};

/// What the bounded-retry commit loop produced.
enum CommitOutcome {
    Committed(UserBalance),
    /// The token was already in the ledger when the commit ran.
    Duplicate,
}

/// The reward ledger core.
///
/// Generic over the store, config backend, catalogs, and clock so the same
/// orchestration logic runs against production backends and in-memory test
/// doubles alike.
pub struct RewardLedger<S, B, SC, AC, C = SystemClock>
where
    S: RewardStore,
    B: ConfigBackend,
    SC: ShopCatalog,
    AC: AchievementCatalog,
    C: Clock,
{
    store: S,
    config: ConfigStore<B>,
    registry: RuleRegistry,
    shop: SC,
    achievements: AC,
    clock: C,
}

impl<S, B, SC, AC> RewardLedger<S, B, SC, AC, SystemClock>
where
    S: RewardStore,
    B: ConfigBackend,
    SC: ShopCatalog,
    AC: AchievementCatalog,
{
    /// Creates a ledger with the built-in rule set and the system clock.
    pub fn new(store: S, config: ConfigStore<B>, shop: SC, achievements: AC) -> Self {
        Self::with_clock(store, config, shop, achievements, SystemClock)
    }
}

impl<S, B, SC, AC, C> RewardLedger<S, B, SC, AC, C>
where
    S: RewardStore,
    B: ConfigBackend,
    SC: ShopCatalog,
    AC: AchievementCatalog,
    C: Clock,
{
    /// Creates a ledger with an explicit clock (tests pin time with
    /// [`ManualClock`](crate::ManualClock)).
    pub fn with_clock(
        store: S,
        config: ConfigStore<B>,
        shop: SC,
        achievements: AC,
        clock: C,
    ) -> Self {
        Self {
            store,
            config,
            registry: RuleRegistry::default(),
            shop,
            achievements,
            clock,
        }
    }

    // ========================================================================
    // Account lifecycle & reads
    // ========================================================================

    /// Seeds a balance record at account creation.
    pub fn create_user(&self, user_id: UserId) -> Result<BalanceSnapshot, LedgerError> {
        Ok(self.store.create_user(user_id)?.snapshot())
    }

    /// Current committed `{points, level}`.
    pub fn balance(&self, user_id: &UserId) -> Result<BalanceSnapshot, LedgerError> {
        Ok(self
            .store
            .balance(user_id)?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?
            .snapshot())
    }

    /// Full audit trail for a user, oldest first.
    pub fn history(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.store.entries_for(user_id)?)
    }

    /// Progress through the user's current level band.
    pub fn level_progress(&self, user_id: &UserId) -> Result<LevelProgress, LedgerError> {
        let config = self.config.read()?;
        let balance = self
            .store
            .balance(user_id)?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?;
        Ok(config.level_progress(balance.points))
    }

    // ========================================================================
    // Configuration (admin-facing)
    // ========================================================================

    /// The current reward configuration document.
    pub fn read_config(&self) -> Result<RewardConfig, LedgerError> {
        Ok(self.config.read()?)
    }

    /// Replaces the reward configuration. Admin only. Returns the new row
    /// version; validation failures persist nothing.
    pub fn write_config(
        &self,
        doc: &serde_json::Value,
        actor: &Actor,
    ) -> Result<u64, LedgerError> {
        if !actor.is_privileged() {
            return Err(LedgerError::PermissionDenied(actor.id.clone()));
        }
        Ok(self.config.write(doc, &actor.id)?)
    }

    // ========================================================================
    // Credits: external reward events
    // ========================================================================

    /// Processes one reward-triggering event.
    ///
    /// The caller constructs the idempotency token from the action's natural
    /// identity (task ID, date-scoped login key, per-submission ID); invoking
    /// this twice with the same token credits the delta exactly once.
    pub fn process_event(
        &self,
        user_id: &UserId,
        event: &RewardEvent,
        token: IdempotencyToken,
    ) -> Result<Outcome, LedgerError> {
        let config = self.config.read()?;

        let reward = self.registry.total_reward(event, &config);
        if reward == 0 {
            tracing::debug!(user = %user_id, "no rule produced a reward");
            return Ok(Outcome::Noop(NoopReason::ZeroReward));
        }

        let reward = if event.is_capped() {
            match cap::clamp_high_reward(&self.store, &config, user_id, reward, self.clock.now())?
            {
                CapDecision::Exhausted => {
                    tracing::debug!(user = %user_id, cap = config.daily_high_cap, "daily high cap exhausted");
                    return Ok(Outcome::Noop(NoopReason::CapExhausted));
                }
                CapDecision::Allow(clamped) => {
                    if clamped < reward {
                        tracing::debug!(user = %user_id, reward, clamped, "daily high cap clamped reward");
                    }
                    clamped
                }
            }
        } else {
            reward
        };

        // The sole and complete duplicate-suppression mechanism. The commit
        // re-checks under its own lock, so a racing duplicate still cannot
        // double-credit.
        if self.store.contains_token(&token)? {
            tracing::debug!(user = %user_id, token = %token, "event already processed");
            return Ok(Outcome::Noop(NoopReason::AlreadyProcessed));
        }

        let delta = reward as i64;
        match self.commit_with_retry(user_id, event.kind(), &token, &config, |_| Ok(delta))? {
            CommitOutcome::Committed(balance) => Ok(Outcome::Applied(balance.snapshot())),
            CommitOutcome::Duplicate => Ok(Outcome::Noop(NoopReason::AlreadyProcessed)),
        }
    }

    // ========================================================================
    // Debits: shop purchases
    // ========================================================================

    /// Buys an item at its authoritative catalog cost.
    ///
    /// Unknown and hidden items are rejected alike. Privileged actors pay
    /// zero but still leave a distinctly tagged ledger row for audit.
    pub fn purchase(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        actor: &Actor,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let item = self
            .shop
            .item(item_id)?
            .filter(|item| item.visible)
            .ok_or_else(|| LedgerError::ItemNotFound(item_id.clone()))?;

        let privileged = actor.is_privileged();
        let cost = if privileged { 0 } else { item.cost as i64 };
        let kind = if privileged {
            EventKind::ShopBuyPrivileged
        } else {
            EventKind::ShopBuy
        };
        let token = IdempotencyToken::for_purchase(item_id);
        let config = self.config.read()?;

        match self.commit_with_retry(user_id, kind, &token, &config, |balance| {
            // Checked against the freshly read balance on every retry, so a
            // concurrent debit cannot slip the account below zero.
            if !privileged && balance.points < cost {
                return Err(LedgerError::InsufficientBalance {
                    have: balance.points,
                    need: cost,
                });
            }
            Ok(-cost)
        })? {
            CommitOutcome::Committed(balance) => Ok(balance.snapshot()),
            // The token is minted fresh per call; a duplicate here means the
            // same transaction already landed, so the current balance is the
            // committed answer.
            CommitOutcome::Duplicate => self.balance(user_id),
        }
    }

    // ========================================================================
    // Catalog-bounded credits: achievement claims
    // ========================================================================

    /// Claims an achievement at its authoritative catalog reward.
    ///
    /// The token derives from the achievement ID (date-scoped for daily
    /// recurrence), so a double claim is a no-op success, not an error.
    pub fn claim(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
    ) -> Result<Outcome, LedgerError> {
        let def = self
            .achievements
            .achievement(achievement_id)?
            .filter(|def| def.visible)
            .ok_or_else(|| LedgerError::AchievementNotFound(achievement_id.clone()))?;

        if def.reward == 0 {
            return Ok(Outcome::Noop(NoopReason::ZeroReward));
        }

        let token = IdempotencyToken::for_achievement(&def.id, def.recurrence, self.clock.now());
        if self.store.contains_token(&token)? {
            tracing::debug!(user = %user_id, achievement = %achievement_id, "achievement already claimed");
            return Ok(Outcome::Noop(NoopReason::AlreadyProcessed));
        }

        let config = self.config.read()?;
        let delta = def.reward as i64;
        match self.commit_with_retry(
            user_id,
            EventKind::AchievementClaim,
            &token,
            &config,
            |_| Ok(delta),
        )? {
            CommitOutcome::Committed(balance) => Ok(Outcome::Applied(balance.snapshot())),
            CommitOutcome::Duplicate => Ok(Outcome::Noop(NoopReason::AlreadyProcessed)),
        }
    }

    // ========================================================================
    // Administrative grants
    // ========================================================================

    /// Credits points directly. Admin only; the caller supplies the token so
    /// a replayed grant request stays a no-op.
    pub fn grant(
        &self,
        user_id: &UserId,
        amount: u64,
        actor: &Actor,
        token: IdempotencyToken,
    ) -> Result<Outcome, LedgerError> {
        if !actor.is_privileged() {
            return Err(LedgerError::PermissionDenied(actor.id.clone()));
        }
        if amount == 0 {
            return Ok(Outcome::Noop(NoopReason::ZeroReward));
        }
        if self.store.contains_token(&token)? {
            return Ok(Outcome::Noop(NoopReason::AlreadyProcessed));
        }

        let config = self.config.read()?;
        let delta = amount as i64;
        match self.commit_with_retry(user_id, EventKind::AdminGrant, &token, &config, |_| {
            Ok(delta)
        })? {
            CommitOutcome::Committed(balance) => {
                tracing::info!(user = %user_id, amount, granted_by = %actor.id, "admin grant applied");
                Ok(Outcome::Applied(balance.snapshot()))
            }
            CommitOutcome::Duplicate => Ok(Outcome::Noop(NoopReason::AlreadyProcessed)),
        }
    }

    // ========================================================================
    // The bounded optimistic-retry commit, shared by every path above
    // ========================================================================

    /// Reads the balance, computes the delta and derived level, and commits;
    /// on a version conflict, retries the whole sequence from a fresh read.
    ///
    /// `delta_for` sees the freshly read balance on each attempt so debit
    /// preconditions are re-validated under contention. Reward computation
    /// is stateless given the event, so the retry is always safe.
    fn commit_with_retry(
        &self,
        user_id: &UserId,
        kind: EventKind,
        token: &IdempotencyToken,
        config: &RewardConfig,
        delta_for: impl Fn(&UserBalance) -> Result<i64, LedgerError>,
    ) -> Result<CommitOutcome, LedgerError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let balance = self
                .store
                .balance(user_id)?
                .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?;

            let delta = delta_for(&balance)?;
            let new_level = config.level_for(balance.points + delta);
            let entry = LedgerEntry::new(
                user_id.clone(),
                kind,
                token.clone(),
                delta,
                self.clock.now(),
            );

            match self.store.commit(entry, balance.version, new_level) {
                Ok(updated) => {
                    // Invariant: the committed level matches the committed
                    // points under the config this operation ran with.
                    debug_assert_eq!(updated.level, config.level_for(updated.points));
                    tracing::info!(
                        user = %user_id,
                        kind = %kind,
                        delta,
                        points = updated.points,
                        level = updated.level,
                        "ledger entry committed"
                    );
                    return Ok(CommitOutcome::Committed(updated));
                }
                Err(CommitError::DuplicateToken(_)) => return Ok(CommitOutcome::Duplicate),
                Err(CommitError::VersionConflict {
                    expected, actual, ..
                }) => {
                    tracing::debug!(
                        user = %user_id,
                        attempt,
                        expected,
                        actual,
                        "version conflict, retrying from a fresh read"
                    );
                }
                Err(CommitError::UserNotFound(id)) => return Err(LedgerError::UserNotFound(id)),
                Err(CommitError::Backend(msg)) => {
                    return Err(LedgerError::Store(StoreError::Backend(msg)));
                }
            }
        }

        tracing::warn!(
            user = %user_id,
            attempts = MAX_COMMIT_ATTEMPTS,
            "optimistic commit exhausted its retries"
        );
        Err(LedgerError::Contention {
            user_id: user_id.clone(),
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }
}
