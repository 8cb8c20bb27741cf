//! The built-in rule variants.

use questline_config::RewardConfig;
use questline_types::RewardEvent;

use crate::Rule;

/// Flat reward for the first login of a calendar day.
///
/// Recurrence control (one credit per day) is delegated entirely to the
/// idempotency token the caller constructs; this rule fires for every
/// `DailyLogin` event it sees.
pub const DAILY_LOGIN_REWARD: u64 = 100;

/// One point of reward per this many points of game score.
pub const GAME_SCORE_DIVISOR: i64 = 50;

/// Task completion: priority-based XP with an early-completion bonus.
#[derive(Debug, Default)]
pub struct TaskCompletionRule;

impl Rule for TaskCompletionRule {
    fn id(&self) -> &'static str {
        "task-completion"
    }

    fn matches(&self, event: &RewardEvent) -> bool {
        matches!(event, RewardEvent::TaskCompleted { .. })
    }

    fn calculate(&self, event: &RewardEvent, config: &RewardConfig) -> u64 {
        let RewardEvent::TaskCompleted {
            priority,
            due_at,
            completed_at,
            ..
        } = event
        else {
            return 0;
        };

        let base = config.xp_by_priority.base_for(*priority);

        // The bonus needs both endpoints; without a due date there is
        // nothing to be early against.
        let (Some(due), Some(completed)) = (due_at, completed_at) else {
            return base;
        };

        let bonus = &config.on_time_bonus;
        // Late completion clamps to zero early minutes: multiplier 1, no
        // penalty.
        let early_minutes = completed.minutes_until(*due).max(0);
        let capped = early_minutes.min(bonus.max_early_minutes);
        let multiplier = 1.0 + bonus.early_bonus_per_minute * capped as f64;

        (base as f64 * multiplier).floor() as u64
    }
}

/// Daily login: fixed flat reward regardless of streak length.
#[derive(Debug, Default)]
pub struct DailyLoginRule;

impl Rule for DailyLoginRule {
    fn id(&self) -> &'static str {
        "daily-login"
    }

    fn matches(&self, event: &RewardEvent) -> bool {
        matches!(event, RewardEvent::DailyLogin)
    }

    fn calculate(&self, _event: &RewardEvent, _config: &RewardConfig) -> u64 {
        DAILY_LOGIN_REWARD
    }
}

/// Game session: reward proportional to score via a fixed divisor.
#[derive(Debug, Default)]
pub struct GameSessionRule;

impl Rule for GameSessionRule {
    fn id(&self) -> &'static str {
        "game-session"
    }

    fn matches(&self, event: &RewardEvent) -> bool {
        matches!(event, RewardEvent::GameSessionCompleted { .. })
    }

    fn calculate(&self, event: &RewardEvent, _config: &RewardConfig) -> u64 {
        let RewardEvent::GameSessionCompleted { score, .. } = event else {
            return 0;
        };
        if *score <= 0 {
            return 0;
        }
        (*score / GAME_SCORE_DIVISOR) as u64
    }
}
