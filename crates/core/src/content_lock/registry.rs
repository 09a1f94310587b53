//! The lock registry: acquire, inspect, and release.
//!
//! Acquisition is advisory. It never blocks the edit view; it only reports
//! who holds the lock so the host can warn and offer a bypass. Internal races
//! and store failures during acquisition are absorbed and reported as
//! [`LockOutcome::Unavailable`].

use chrono::Utc;

use super::guard;
use super::model::{LockKey, LockOutcome, LockRecord, NewLock, WriteAction, WriteDecision};
use super::store::{InsertOutcome, LockStore};
use super::sweeper;
use crate::error::CoreError;
use crate::maintenance::CleanJob;
use crate::settings::LockSettings;
use crate::types::DbId;

/// Lock lifecycle engine over a [`LockStore`].
#[derive(Debug, Clone)]
pub struct LockRegistry<S> {
    store: S,
}

impl<S: LockStore> LockRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Claim or refresh the lock on `key` for `requester_id`.
    ///
    /// Runs the expiry sweep first (unless expiry is disabled), then:
    /// - no lock: creates one ([`LockOutcome::Acquired`]);
    /// - own lock: refreshes its timestamp ([`LockOutcome::SelfAlreadyLocked`]);
    /// - someone else's lock: reports it untouched ([`LockOutcome::HeldByOther`]).
    pub async fn acquire(
        &self,
        settings: &LockSettings,
        key: &LockKey,
        requester_id: DbId,
    ) -> Result<LockOutcome, CoreError> {
        if settings.disabled {
            return Ok(LockOutcome::Disabled);
        }

        self.sweep_opportunistically(settings).await;

        let existing = self.store.find(key).await.map_err(CoreError::store)?;
        let record = match existing {
            Some(record) => record,
            None => match self.insert(key, requester_id).await {
                Some(InsertOutcome::Inserted(record)) => {
                    tracing::info!(
                        user_id = requester_id,
                        entity_kind = %key.entity_kind,
                        entity_id = key.entity_id,
                        lock_id = record.id,
                        "Content lock acquired"
                    );
                    return Ok(LockOutcome::Acquired { lock: record });
                }
                Some(InsertOutcome::AlreadyExists(winner)) => {
                    tracing::debug!(
                        user_id = requester_id,
                        entity_kind = %key.entity_kind,
                        entity_id = key.entity_id,
                        winner_id = winner.owner_id,
                        "Lost content lock insert race"
                    );
                    winner
                }
                Some(InsertOutcome::Vanished) => {
                    tracing::warn!(
                        user_id = requester_id,
                        entity_kind = %key.entity_kind,
                        entity_id = key.entity_id,
                        "Content lock race winner vanished; editing without lock"
                    );
                    return Ok(LockOutcome::Unavailable);
                }
                None => return Ok(LockOutcome::Unavailable),
            },
        };

        if !record.is_owned_by(requester_id) {
            return Ok(LockOutcome::HeldByOther { lock: record });
        }

        self.refresh(record, requester_id).await
    }

    /// Read the lock on `key` without creating or refreshing it.
    ///
    /// Used by delete confirmation views. Expired locks are swept first.
    /// Returns `None` when locking is disabled or the key is free.
    pub async fn inspect(
        &self,
        settings: &LockSettings,
        key: &LockKey,
    ) -> Result<Option<LockRecord>, CoreError> {
        if settings.disabled {
            return Ok(None);
        }
        self.sweep_opportunistically(settings).await;
        self.store.find(key).await.map_err(CoreError::store)
    }

    /// Current lock on `key`, with no sweep and no side effect.
    pub async fn find(&self, key: &LockKey) -> Result<Option<LockRecord>, CoreError> {
        self.store.find(key).await.map_err(CoreError::store)
    }

    /// Release the lock on `key` if `requester_id` holds it.
    ///
    /// Returns the released record, or `None` if the requester held no lock.
    pub async fn release(
        &self,
        key: &LockKey,
        requester_id: DbId,
    ) -> Result<Option<LockRecord>, CoreError> {
        let Some(record) = self.store.find(key).await.map_err(CoreError::store)? else {
            return Ok(None);
        };
        if !record.is_owned_by(requester_id) {
            return Ok(None);
        }
        let removed = self.store.delete(record.id).await.map_err(CoreError::store)?;
        if removed {
            tracing::info!(
                user_id = requester_id,
                entity_kind = %key.entity_kind,
                entity_id = key.entity_id,
                "Content lock released"
            );
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// Decide whether a write may commit. See [`guard::check_on_write`].
    pub async fn check_on_write(
        &self,
        settings: &LockSettings,
        key: &LockKey,
        requester_id: DbId,
        action: WriteAction,
        bypass: bool,
    ) -> Result<WriteDecision, CoreError> {
        guard::check_on_write(&self.store, settings, key, requester_id, action, bypass).await
    }

    /// Run the administrative cleanup. Returns the matched or removed count.
    pub async fn bulk_clean(&self, job: &CleanJob) -> Result<u64, CoreError> {
        sweeper::bulk_clean(&self.store, job.mode, job.max_age, &job.owner_ids, Utc::now()).await
    }

    /// Remove every lock held by a user that is being deleted.
    ///
    /// Stores with a cascading foreign key do this on their own; this is for
    /// deployments where the user table lives elsewhere.
    pub async fn release_all_for_owner(&self, owner_id: DbId) -> Result<u64, CoreError> {
        let removed = self
            .store
            .delete_matching(&super::model::LockFilter::owned_by(owner_id))
            .await
            .map_err(CoreError::store)?;
        tracing::info!(owner_id, removed, "Content locks of user removed");
        Ok(removed)
    }

    async fn sweep_opportunistically(&self, settings: &LockSettings) {
        if !settings.expiry_enabled() {
            return;
        }
        if let Err(e) = sweeper::sweep_expired(&self.store, settings.ttl_seconds, Utc::now()).await
        {
            tracing::warn!(error = %e, "Content lock sweep failed");
        }
    }

    /// Insert a fresh lock. `None` means the store failed and the caller
    /// should proceed unlocked.
    async fn insert(&self, key: &LockKey, requester_id: DbId) -> Option<InsertOutcome> {
        let new_lock = NewLock {
            key: key.clone(),
            owner_id: requester_id,
            created_at: Utc::now(),
        };
        match self.store.insert_if_absent(new_lock).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = requester_id,
                    entity_kind = %key.entity_kind,
                    entity_id = key.entity_id,
                    "Content lock insert failed; editing without lock"
                );
                None
            }
        }
    }

    async fn refresh(
        &self,
        record: LockRecord,
        requester_id: DbId,
    ) -> Result<LockOutcome, CoreError> {
        let previous_since = record.created_at;
        let refreshed = self
            .store
            .refresh(record.id, Utc::now())
            .await
            .map_err(CoreError::store)?;
        match refreshed {
            Some(record) => {
                tracing::debug!(
                    user_id = requester_id,
                    lock_id = record.id,
                    "Content lock refreshed"
                );
                Ok(LockOutcome::SelfAlreadyLocked {
                    lock: record,
                    previous_since,
                })
            }
            None => Ok(LockOutcome::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, SecondsFormat};

    use super::*;
    use crate::content_lock::memory::MemoryLockStore;
    use crate::content_lock::model::LockFilter;
    use crate::types::Timestamp;

    const USER_A: DbId = 1;
    const USER_B: DbId = 2;

    fn settings() -> LockSettings {
        LockSettings {
            disabled: false,
            ttl_seconds: 3600,
        }
    }

    fn item(id: DbId) -> LockKey {
        LockKey::new("items", id)
    }

    async fn seed(store: &MemoryLockStore, key: LockKey, owner_id: DbId, created_at: Timestamp) {
        store
            .insert_if_absent(NewLock {
                key,
                owner_id,
                created_at,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_acquire_creates_lock() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        assert_matches!(&outcome, LockOutcome::Acquired { lock: r } if r.owner_id == USER_A);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn reacquire_by_owner_refreshes_same_record() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        let t0 = Utc::now() - Duration::minutes(20);
        seed(&store, item(42), USER_A, t0).await;
        let id = store.records()[0].id;

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        let LockOutcome::SelfAlreadyLocked { lock: record, .. } = outcome else {
            panic!("expected SelfAlreadyLocked, got {outcome:?}");
        };
        assert_eq!(record.id, id);
        assert!(record.created_at > t0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn reacquire_notice_shows_when_the_earlier_session_started() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        let t0 = Utc::now() - Duration::minutes(50);
        seed(&store, item(42), USER_A, t0).await;

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        assert_matches!(
            &outcome,
            LockOutcome::SelfAlreadyLocked { lock, previous_since }
                if *previous_since == t0 && lock.created_at > t0
        );

        let notice = crate::notice::for_acquire(&outcome, false).unwrap();
        let since = t0.to_rfc3339_opts(SecondsFormat::Secs, true);
        assert!(notice.message.contains(&since), "{}", notice.message);
    }

    #[tokio::test]
    async fn acquire_by_other_reports_holder_without_mutation() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        let t0 = Utc::now() - Duration::minutes(5);
        seed(&store, item(42), USER_A, t0).await;

        let outcome = registry.acquire(&settings(), &item(42), USER_B).await.unwrap();
        assert_matches!(
            &outcome,
            LockOutcome::HeldByOther { lock: r } if r.owner_id == USER_A && r.created_at == t0
        );
        assert!(outcome.is_held_by_other());
        assert_eq!(store.records()[0].created_at, t0);
    }

    #[tokio::test]
    async fn acquire_sweeps_expired_locks_on_any_key() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        seed(&store, item(1), USER_B, Utc::now() - Duration::hours(2)).await;

        registry.acquire(&settings(), &item(2), USER_A).await.unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_id, 2);
    }

    #[tokio::test]
    async fn zero_ttl_never_sweeps() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        seed(&store, item(1), USER_B, Utc::now() - Duration::hours(2)).await;

        let no_expiry = LockSettings {
            disabled: false,
            ttl_seconds: 0,
        };
        registry.acquire(&no_expiry, &item(2), USER_A).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn expired_lock_of_other_user_is_taken_over() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        seed(&store, item(42), USER_B, Utc::now() - Duration::hours(2)).await;

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        assert_matches!(outcome, LockOutcome::Acquired { lock: r } if r.owner_id == USER_A);
    }

    #[tokio::test]
    async fn disabled_feature_takes_no_lock() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        let disabled = LockSettings {
            disabled: true,
            ..settings()
        };
        let outcome = registry.acquire(&disabled, &item(42), USER_A).await.unwrap();
        assert_eq!(outcome, LockOutcome::Disabled);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn inspect_neither_creates_nor_refreshes() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());

        assert!(registry.inspect(&settings(), &item(42)).await.unwrap().is_none());
        assert!(store.is_empty());

        let t0 = Utc::now() - Duration::minutes(10);
        seed(&store, item(42), USER_A, t0).await;
        let found = registry.inspect(&settings(), &item(42)).await.unwrap().unwrap();
        assert_eq!(found.created_at, t0);
    }

    #[tokio::test]
    async fn release_only_by_owner() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        seed(&store, item(42), USER_A, Utc::now()).await;

        assert!(registry.release(&item(42), USER_B).await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        let released = registry.release(&item(42), USER_A).await.unwrap();
        assert_matches!(released, Some(r) if r.owner_id == USER_A);
        assert!(store.is_empty());

        assert!(registry.release(&item(42), USER_A).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn release_all_for_owner_is_the_cascade() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        seed(&store, item(1), USER_A, Utc::now()).await;
        seed(&store, item(2), USER_A, Utc::now()).await;
        seed(&store, item(3), USER_B, Utc::now()).await;

        assert_eq!(registry.release_all_for_owner(USER_A).await.unwrap(), 2);
        assert_eq!(store.records()[0].owner_id, USER_B);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquires_leave_exactly_one_lock() {
        let store = MemoryLockStore::new();
        let registry = Arc::new(LockRegistry::new(store.clone()));

        let handles: Vec<_> = (1..=16)
            .map(|user_id| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.acquire(&settings(), &item(42), user_id).await.unwrap()
                })
            })
            .collect();
        let outcomes: Vec<LockOutcome> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let acquired = outcomes
            .iter()
            .filter(|o| matches!(o, LockOutcome::Acquired { .. }))
            .count();
        assert_eq!(acquired, 1);
        assert_eq!(store.count_matching(&LockFilter::all()).await.unwrap(), 1);

        let owner = store.records()[0].owner_id;
        for outcome in &outcomes {
            let lock = outcome.lock().expect("every caller sees the lock");
            assert_eq!(lock.owner_id, owner);
        }
    }

    // -----------------------------------------------------------------------
    // Race recovery, driven by a store that always loses the insert race
    // -----------------------------------------------------------------------

    struct RacingStore {
        inner: MemoryLockStore,
        winner_vanishes: bool,
    }

    impl LockStore for RacingStore {
        type Error = Infallible;

        async fn find(&self, _key: &LockKey) -> Result<Option<LockRecord>, Infallible> {
            Ok(None)
        }

        async fn insert_if_absent(&self, lock: NewLock) -> Result<InsertOutcome, Infallible> {
            if self.winner_vanishes {
                return Ok(InsertOutcome::Vanished);
            }
            let winner = NewLock {
                owner_id: USER_B,
                ..lock.clone()
            };
            self.inner.insert_if_absent(winner).await?;
            self.inner.insert_if_absent(lock).await
        }

        async fn refresh(
            &self,
            id: DbId,
            at: Timestamp,
        ) -> Result<Option<LockRecord>, Infallible> {
            self.inner.refresh(id, at).await
        }

        async fn delete(&self, id: DbId) -> Result<bool, Infallible> {
            self.inner.delete(id).await
        }

        async fn count_matching(&self, filter: &LockFilter) -> Result<u64, Infallible> {
            self.inner.count_matching(filter).await
        }

        async fn delete_matching(&self, filter: &LockFilter) -> Result<u64, Infallible> {
            self.inner.delete_matching(filter).await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_reports_winner() {
        let inner = MemoryLockStore::new();
        let registry = LockRegistry::new(RacingStore {
            inner: inner.clone(),
            winner_vanishes: false,
        });

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        assert_matches!(outcome, LockOutcome::HeldByOther { lock: r } if r.owner_id == USER_B);
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn vanished_winner_fails_open() {
        let registry = LockRegistry::new(RacingStore {
            inner: MemoryLockStore::new(),
            winner_vanishes: true,
        });

        let outcome = registry.acquire(&settings(), &item(42), USER_A).await.unwrap();
        assert_eq!(outcome, LockOutcome::Unavailable);
    }
}
