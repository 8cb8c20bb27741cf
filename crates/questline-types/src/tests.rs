//! Unit tests for questline-types.

use test_case::test_case;

use crate::{
    AchievementId, EventKind, IdempotencyToken, ItemId, Priority, Recurrence, RewardEvent,
    Timestamp, UserBalance, UserId,
};

// ============================================================================
// Timestamp Tests
// ============================================================================

#[test]
fn day_start_truncates_to_midnight_utc() {
    // 2026-03-05 14:30:00 UTC
    let ts = Timestamp::from_millis(1_772_721_000_000);
    let start = ts.day_start();

    assert_eq!(start.date_string(), ts.date_string());
    assert_eq!(start.as_millis() % 86_400_000, 0);
    assert!(start <= ts);
}

#[test]
fn calendar_math_saturates_at_extreme_timestamps() {
    for millis in [i64::MIN, i64::MAX] {
        let ts = Timestamp::from_millis(millis);
        // Out of chrono's range; must clamp, not panic.
        let _ = ts.day_start();
        assert!(!ts.date_string().is_empty());
    }
}

#[test]
fn day_start_is_idempotent() {
    let ts = Timestamp::from_millis(1_772_721_000_000);
    assert_eq!(ts.day_start(), ts.day_start().day_start());
}

#[test_case(0, 60_000, 1; "one minute apart")]
#[test_case(0, 59_999, 0; "truncates partial minutes")]
#[test_case(60_000, 0, -1; "negative when later is earlier")]
#[test_case(0, 3_600_000, 60; "one hour apart")]
fn minutes_until_cases(from: i64, to: i64, expected: i64) {
    let from = Timestamp::from_millis(from);
    let to = Timestamp::from_millis(to);
    assert_eq!(from.minutes_until(to), expected);
}

// ============================================================================
// Idempotency Token Tests
// ============================================================================

#[test]
fn login_token_is_scoped_to_user_and_day() {
    let user = UserId::from("u1");
    let morning = Timestamp::from_millis(1_772_668_800_000); // midnight
    let evening = Timestamp::from_millis(1_772_668_800_000 + 20 * 3_600_000);
    let next_day = Timestamp::from_millis(1_772_668_800_000 + 25 * 3_600_000);

    assert_eq!(
        IdempotencyToken::for_login(&user, morning),
        IdempotencyToken::for_login(&user, evening)
    );
    assert_ne!(
        IdempotencyToken::for_login(&user, morning),
        IdempotencyToken::for_login(&user, next_day)
    );
    assert_ne!(
        IdempotencyToken::for_login(&user, morning),
        IdempotencyToken::for_login(&UserId::from("u2"), morning)
    );
}

#[test]
fn one_shot_achievement_token_ignores_date() {
    let id = AchievementId::from("first_task");
    let t1 = Timestamp::from_millis(0);
    let t2 = Timestamp::from_millis(90 * 86_400_000);

    assert_eq!(
        IdempotencyToken::for_achievement(&id, Recurrence::Once, t1),
        IdempotencyToken::for_achievement(&id, Recurrence::Once, t2)
    );
}

#[test]
fn daily_achievement_token_varies_by_date() {
    let id = AchievementId::from("daily_login");
    let t1 = Timestamp::from_millis(0);
    let t2 = Timestamp::from_millis(86_400_000);

    assert_ne!(
        IdempotencyToken::for_achievement(&id, Recurrence::Daily, t1),
        IdempotencyToken::for_achievement(&id, Recurrence::Daily, t2)
    );
}

#[test]
fn purchase_tokens_are_unique_per_call() {
    let item = ItemId::from("avatar_hat");
    assert_ne!(
        IdempotencyToken::for_purchase(&item),
        IdempotencyToken::for_purchase(&item)
    );
}

// ============================================================================
// Event Kind Mapping Tests
// ============================================================================

#[test_case(Priority::Low, EventKind::TaskComplete)]
#[test_case(Priority::Medium, EventKind::TaskComplete)]
#[test_case(Priority::High, EventKind::TaskCompleteHigh)]
fn task_kind_tracks_priority(priority: Priority, expected: EventKind) {
    let event = RewardEvent::TaskCompleted {
        task_id: "t1".to_string(),
        priority,
        due_at: None,
        completed_at: None,
    };
    assert_eq!(event.kind(), expected);
    assert_eq!(event.is_capped(), expected == EventKind::TaskCompleteHigh);
}

#[test]
fn only_high_tasks_are_capped() {
    assert!(!RewardEvent::DailyLogin.is_capped());
    assert!(
        !RewardEvent::GameSessionCompleted {
            game_id: "2048".to_string(),
            score: 1000,
        }
        .is_capped()
    );
}

// ============================================================================
// Balance Record Tests
// ============================================================================

#[test]
fn new_balance_starts_at_level_one_version_one() {
    let balance = UserBalance::new(UserId::from("u1"));
    assert_eq!(balance.points, 0);
    assert_eq!(balance.level, 1);
    assert_eq!(balance.version, 1);
}

#[test_case("\"LOW\"", Priority::Low)]
#[test_case("\"MEDIUM\"", Priority::Medium)]
#[test_case("\"HIGH\"", Priority::High)]
#[test_case("\"URGENT\"", Priority::Medium; "unknown variant falls back to medium")]
#[test_case("\"high\"", Priority::Medium; "matching is case sensitive")]
#[test_case("\"\"", Priority::Medium; "empty string falls back to medium")]
fn priority_deserializes_with_medium_fallback(json: &str, expected: Priority) {
    let parsed: Priority = serde_json::from_str(json).expect("priority strings always parse");
    assert_eq!(parsed, expected);
}

#[test]
fn priority_serializes_uppercase() {
    assert_eq!(
        serde_json::to_string(&Priority::High).expect("serializable"),
        "\"HIGH\""
    );
    assert_eq!(Priority::default(), Priority::Medium);
}
