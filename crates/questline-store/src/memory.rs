//! In-memory reference implementation of [`RewardStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use questline_types::{EventKind, IdempotencyToken, LedgerEntry, Timestamp, UserBalance, UserId};

use crate::{CommitError, RewardStore, StoreError};

/// In-memory store. One mutex guards both tables, so the commit's
/// token-check-then-conditional-write sequence is naturally atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    balances: BTreeMap<UserId, UserBalance>,
    entries: Vec<LedgerEntry>,
    tokens: BTreeSet<IdempotencyToken>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

impl RewardStore for MemoryStore {
    fn create_user(&self, user_id: UserId) -> Result<UserBalance, StoreError> {
        let mut inner = self.lock()?;
        if inner.balances.contains_key(&user_id) {
            return Err(StoreError::UserAlreadyExists(user_id));
        }
        let balance = UserBalance::new(user_id.clone());
        inner.balances.insert(user_id, balance.clone());
        Ok(balance)
    }

    fn balance(&self, user_id: &UserId) -> Result<Option<UserBalance>, StoreError> {
        Ok(self.lock()?.balances.get(user_id).cloned())
    }

    fn contains_token(&self, token: &IdempotencyToken) -> Result<bool, StoreError> {
        Ok(self.lock()?.tokens.contains(token))
    }

    fn sum_since(
        &self,
        user_id: &UserId,
        kind: EventKind,
        since: Timestamp,
    ) -> Result<i64, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == *user_id && e.kind == kind && e.created_at >= since)
            .map(|e| e.points_delta)
            .sum())
    }

    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == *user_id)
            .cloned()
            .collect())
    }

    fn commit(
        &self,
        entry: LedgerEntry,
        expected_version: u64,
        new_level: u32,
    ) -> Result<UserBalance, CommitError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CommitError::Backend("store lock poisoned".to_string()))?;

        // Token check first: a duplicate means the action already applied,
        // regardless of what the balance looks like now.
        if inner.tokens.contains(&entry.token) {
            return Err(CommitError::DuplicateToken(entry.token));
        }

        let balance = inner
            .balances
            .get(&entry.user_id)
            .ok_or_else(|| CommitError::UserNotFound(entry.user_id.clone()))?;

        if balance.version != expected_version {
            return Err(CommitError::VersionConflict {
                user_id: entry.user_id.clone(),
                expected: expected_version,
                actual: balance.version,
            });
        }

        // Both writes under the same guard: the entry and the balance update
        // commit together or not at all.
        let updated = {
            let balance = inner
                .balances
                .get_mut(&entry.user_id)
                .ok_or_else(|| CommitError::UserNotFound(entry.user_id.clone()))?;
            balance.points += entry.points_delta;
            balance.level = new_level;
            balance.version += 1;
            balance.clone()
        };
        inner.tokens.insert(entry.token.clone());
        inner.entries.push(entry);

        // Postcondition: the ledger still sums to the balance for this user.
        debug_assert_eq!(
            inner
                .entries
                .iter()
                .filter(|e| e.user_id == updated.user_id)
                .map(|e| e.points_delta)
                .sum::<i64>(),
            updated.points,
            "ledger conservation violated for user {}",
            updated.user_id
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use questline_types::EventKind;

    use super::*;

    fn user() -> UserId {
        UserId::from("u1")
    }

    fn entry(delta: i64, token: &str, kind: EventKind, at: i64) -> LedgerEntry {
        LedgerEntry::new(
            user(),
            kind,
            IdempotencyToken::from(token),
            delta,
            Timestamp::from_millis(at),
        )
    }

    fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_user(user()).expect("create user");
        store
    }

    #[test]
    fn create_user_seeds_initial_record() {
        let store = MemoryStore::new();
        let balance = store.create_user(user()).expect("create");
        assert_eq!(balance.points, 0);
        assert_eq!(balance.level, 1);
        assert_eq!(balance.version, 1);
    }

    #[test]
    fn create_user_twice_fails() {
        let store = store_with_user();
        assert!(matches!(
            store.create_user(user()),
            Err(StoreError::UserAlreadyExists(_))
        ));
    }

    #[test]
    fn commit_applies_delta_level_and_version_together() {
        let store = store_with_user();
        let updated = store
            .commit(entry(25, "t1", EventKind::TaskComplete, 0), 1, 1)
            .expect("commit");
        assert_eq!(updated.points, 25);
        assert_eq!(updated.version, 2);
        assert!(store.contains_token(&IdempotencyToken::from("t1")).expect("read"));
        assert_eq!(store.entries_for(&user()).expect("read").len(), 1);
    }

    #[test]
    fn commit_with_stale_version_conflicts_and_writes_nothing() {
        let store = store_with_user();
        store
            .commit(entry(25, "t1", EventKind::TaskComplete, 0), 1, 1)
            .expect("first commit");

        let result = store.commit(entry(25, "t2", EventKind::TaskComplete, 0), 1, 1);
        assert!(matches!(result, Err(CommitError::VersionConflict { .. })));

        // Nothing from the failed commit is visible.
        assert!(!store.contains_token(&IdempotencyToken::from("t2")).expect("read"));
        assert_eq!(store.entries_for(&user()).expect("read").len(), 1);
        let balance = store.balance(&user()).expect("read").expect("exists");
        assert_eq!(balance.points, 25);
    }

    #[test]
    fn commit_with_duplicate_token_is_rejected() {
        let store = store_with_user();
        store
            .commit(entry(25, "t1", EventKind::TaskComplete, 0), 1, 1)
            .expect("first commit");

        let result = store.commit(entry(25, "t1", EventKind::TaskComplete, 0), 2, 1);
        assert!(matches!(result, Err(CommitError::DuplicateToken(_))));
        let balance = store.balance(&user()).expect("read").expect("exists");
        assert_eq!(balance.points, 25);
    }

    #[test]
    fn commit_for_unknown_user_fails() {
        let store = MemoryStore::new();
        let result = store.commit(entry(25, "t1", EventKind::TaskComplete, 0), 1, 1);
        assert!(matches!(result, Err(CommitError::UserNotFound(_))));
    }

    #[test]
    fn sum_since_filters_by_user_kind_and_time() {
        let store = store_with_user();
        store.create_user(UserId::from("u2")).expect("create u2");

        store
            .commit(entry(60, "a", EventKind::TaskCompleteHigh, 1_000), 1, 1)
            .expect("commit a");
        store
            .commit(entry(60, "b", EventKind::TaskCompleteHigh, 2_000), 2, 1)
            .expect("commit b");
        store
            .commit(entry(25, "c", EventKind::TaskComplete, 3_000), 3, 1)
            .expect("commit c");
        let other = LedgerEntry::new(
            UserId::from("u2"),
            EventKind::TaskCompleteHigh,
            IdempotencyToken::from("d"),
            60,
            Timestamp::from_millis(2_500),
        );
        store.commit(other, 1, 1).expect("commit d");

        // Other users and other kinds are excluded.
        assert_eq!(
            store
                .sum_since(&user(), EventKind::TaskCompleteHigh, Timestamp::EPOCH)
                .expect("sum"),
            120
        );
        // The window is inclusive of `since`.
        assert_eq!(
            store
                .sum_since(
                    &user(),
                    EventKind::TaskCompleteHigh,
                    Timestamp::from_millis(2_000)
                )
                .expect("sum"),
            60
        );
    }

    #[test]
    fn debits_reduce_the_balance() {
        let store = store_with_user();
        store
            .commit(entry(1000, "grant", EventKind::AdminGrant, 0), 1, 1)
            .expect("credit");
        let updated = store
            .commit(entry(-450, "buy", EventKind::ShopBuy, 1), 2, 1)
            .expect("debit");
        assert_eq!(updated.points, 550);
    }
}
