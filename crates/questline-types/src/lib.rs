//! # questline-types: Core types for the Questline reward ledger
//!
//! This crate contains shared types used across the ledger:
//! - Entity IDs ([`UserId`], [`EntryId`], [`ItemId`], [`AchievementId`])
//! - Idempotency ([`IdempotencyToken`])
//! - Temporal types ([`Timestamp`])
//! - Ledger records ([`LedgerEntry`], [`EventKind`])
//! - Balance records ([`UserBalance`], [`BalanceSnapshot`])
//! - Reward events ([`RewardEvent`], [`Priority`])
//! - Catalog records ([`ShopItem`], [`AchievementDef`], [`Recurrence`])
//! - Actors ([`Actor`], [`Role`])

use std::fmt::{Debug, Display};

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Unique identifier for a ledger entry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generates a fresh random entry ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Restoration from a stored UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a shop catalog item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for an achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AchievementId(String);

impl AchievementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AchievementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// Idempotency - caller-constructed, scopes an action to at-most-one effect
// ============================================================================

/// Caller-constructed identifier scoping an action to at-most-one ledger
/// effect.
///
/// The token is the sole duplicate-suppression mechanism: at most one ledger
/// entry ever exists per distinct token. Callers derive tokens from the
/// natural identity of the action (the task's own ID, a date-scoped login
/// key, a per-submission ID) so that retried requests collapse onto the same
/// token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token for completing a task: the task's own ID, so a task can only
    /// ever be credited once even if the completion endpoint fires twice.
    pub fn for_task(task_id: &str) -> Self {
        Self(task_id.to_string())
    }

    /// Token for a daily login: `login_<user>_<calendar-date>`, one credit
    /// per user per UTC day.
    pub fn for_login(user_id: &UserId, at: Timestamp) -> Self {
        Self(format!("login_{}_{}", user_id, at.date_string()))
    }

    /// Token for claiming an achievement. Daily-recurring achievements get a
    /// date-scoped token so they can be claimed once per UTC day.
    pub fn for_achievement(id: &AchievementId, recurrence: Recurrence, at: Timestamp) -> Self {
        match recurrence {
            Recurrence::Once => Self(id.as_str().to_string()),
            Recurrence::Daily => Self(format!("{}_{}", id, at.date_string())),
        }
    }

    /// Token for a shop purchase. Purchases have no natural external
    /// identity, so each call mints a fresh transaction token.
    pub fn for_purchase(item_id: &ItemId) -> Self {
        Self(format!("shop_{}_{}", item_id, Uuid::new_v4()))
    }
}

impl Display for IdempotencyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdempotencyToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

// ============================================================================
// Timestamp - millisecond precision wall-clock time
// ============================================================================

/// Wall-clock timestamp in milliseconds since the Unix epoch.
///
/// Millisecond precision matches the granularity the reward rules need
/// (early-completion minutes) and the audit trail stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Creates a timestamp for the current time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Returns the start of this timestamp's UTC calendar day.
    pub fn day_start(&self) -> Timestamp {
        let millis = self
            .as_datetime()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        Timestamp(millis)
    }

    /// Returns the UTC calendar date as `YYYY-MM-DD`, used in date-scoped
    /// idempotency tokens.
    pub fn date_string(&self) -> String {
        self.as_datetime().format("%Y-%m-%d").to_string()
    }

    /// Whole minutes from `self` until `later`. Negative when `later` is
    /// before `self`.
    pub fn minutes_until(&self, later: Timestamp) -> i64 {
        (later.0 - self.0) / 60_000
    }

    // Saturates outside chrono's representable range, so calendar math on
    // extreme hand-built values never panics.
    fn as_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.0).unwrap_or(if self.0 < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================================================
// Event Kinds - closed set of ledger entry tags
// ============================================================================

/// The kind of action a ledger entry records.
///
/// `TaskCompleteHigh` is distinct from `TaskComplete` so that the daily cap
/// aggregate over capped entries stays self-consistent. Likewise
/// `ShopBuyPrivileged` keeps zero-cost administrative purchases auditable
/// separately from ordinary ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A task was completed (LOW or MEDIUM priority).
    TaskComplete,
    /// A HIGH-priority task was completed; counts against the daily cap.
    TaskCompleteHigh,
    /// First login of a calendar day.
    DailyLogin,
    /// An achievement reward was claimed.
    AchievementClaim,
    /// A mini-game session was scored.
    GameSession,
    /// A shop purchase (debit).
    ShopBuy,
    /// A zero-cost purchase by a privileged actor.
    ShopBuyPrivileged,
    /// Points granted directly by an administrator.
    AdminGrant,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskComplete => "task-complete",
            EventKind::TaskCompleteHigh => "task-complete-high",
            EventKind::DailyLogin => "daily-login",
            EventKind::AchievementClaim => "achievement-claim",
            EventKind::GameSession => "game-session",
            EventKind::ShopBuy => "shop-buy",
            EventKind::ShopBuyPrivileged => "shop-buy-privileged",
            EventKind::AdminGrant => "admin-grant",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Reward Events - external triggers fed to the rule registry
// ============================================================================

/// Task priority. Unrecognized priorities deserialize to the default
/// ([`Priority::Medium`]), which also anchors the fallback reward value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl<'de> Deserialize<'de> for Priority {
    /// Hand-rolled so an unrecognized priority string falls back to
    /// [`Priority::Medium`] instead of rejecting the whole event.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "LOW" => Priority::Low,
            "HIGH" => Priority::High,
            _ => Priority::default(),
        })
    }
}

/// An external trigger carried into the rule registry.
///
/// Each variant carries the payload its matching rule needs; the registry
/// evaluates every rule against the event and sums the matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardEvent {
    /// A task moved to DONE.
    TaskCompleted {
        task_id: String,
        priority: Priority,
        /// When the task was due, if a due date was set.
        due_at: Option<Timestamp>,
        /// When the task was completed, if the caller recorded it.
        completed_at: Option<Timestamp>,
    },
    /// First login of the day (recurrence is the token's job, not the rule's).
    DailyLogin,
    /// A mini-game session finished with a score.
    GameSessionCompleted { game_id: String, score: i64 },
}

impl RewardEvent {
    /// The ledger tag this event commits under, before cap retagging.
    pub fn kind(&self) -> EventKind {
        match self {
            RewardEvent::TaskCompleted {
                priority: Priority::High,
                ..
            } => EventKind::TaskCompleteHigh,
            RewardEvent::TaskCompleted { .. } => EventKind::TaskComplete,
            RewardEvent::DailyLogin => EventKind::DailyLogin,
            RewardEvent::GameSessionCompleted { .. } => EventKind::GameSession,
        }
    }

    /// True when this event's reward counts against the daily high cap.
    pub fn is_capped(&self) -> bool {
        matches!(
            self,
            RewardEvent::TaskCompleted {
                priority: Priority::High,
                ..
            }
        )
    }
}

// ============================================================================
// Ledger Entry - immutable, append-only audit row
// ============================================================================

/// One immutable row of the append-only points ledger.
///
/// The ledger is the source of truth for auditing and duplicate suppression:
/// at most one entry exists per distinct token, and for any user the sum of
/// `points_delta` over all entries equals the current balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub kind: EventKind,
    pub token: IdempotencyToken,
    /// Signed delta: credits positive, debits negative.
    pub points_delta: i64,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// Creates a new entry with a freshly generated row ID.
    pub fn new(
        user_id: UserId,
        kind: EventKind,
        token: IdempotencyToken,
        points_delta: i64,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            kind,
            token,
            points_delta,
            created_at,
        }
    }
}

// ============================================================================
// User Balance - the optimistically locked mutable record
// ============================================================================

/// A user's point balance with its optimistic-lock version.
///
/// Mutated only through the store's conditional update; after any committed
/// mutation, `level` equals the configured level for `points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub user_id: UserId,
    pub points: i64,
    pub level: u32,
    /// Optimistic-lock counter; bumped on every committed mutation.
    pub version: u64,
}

impl UserBalance {
    /// Creates the initial balance record at account creation.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            points: 0,
            level: 1,
            version: 1,
        }
    }

    /// The caller-facing view of this balance.
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            points: self.points,
            level: self.level,
        }
    }
}

/// The committed `{points, level}` pair returned to external triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub points: i64,
    pub level: u32,
}

// ============================================================================
// Catalog Records - authoritative cost/reward sources
// ============================================================================

/// A purchasable item in the external shop catalog.
///
/// The ledger never trusts a caller-supplied cost; it reads this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: ItemId,
    pub cost: u64,
    /// Hidden items cannot be purchased.
    pub visible: bool,
}

/// How often an achievement can be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Recurrence {
    /// Claimable exactly once per user.
    #[default]
    Once,
    /// Claimable once per UTC calendar day (date-scoped token).
    Daily,
}

/// An achievement definition in the external achievement catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub reward: u64,
    /// Hidden achievements cannot be claimed.
    pub visible: bool,
    pub recurrence: Recurrence,
}

// ============================================================================
// Actors - who is performing a debit or grant
// ============================================================================

/// Role of the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The principal performing an operation, for privilege checks and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn user(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// Privileged actors pay zero cost in the shop but still leave a
    /// distinctly tagged ledger entry.
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests;
