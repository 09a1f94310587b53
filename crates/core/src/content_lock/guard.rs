//! Write-time conflict detection.
//!
//! Called immediately before an update or delete commits. The lock is always
//! re-read from the store; nothing observed at acquire time is trusted. No
//! sweep runs here, so a lock cannot vanish between the check and the commit
//! because of expiry.

use super::model::{LockKey, LockRecord, WriteAction, WriteDecision};
use super::store::LockStore;
use crate::error::CoreError;
use crate::settings::LockSettings;
use crate::types::DbId;

/// Decide whether `requester_id` may perform `action` on `key`.
///
/// | lock state            | update                    | delete                 |
/// |-----------------------|---------------------------|------------------------|
/// | feature disabled      | allow, lock untouched     | allow, lock removed    |
/// | none                  | allow                     | allow                  |
/// | held by requester     | allow, lock removed       | allow, lock removed    |
/// | held by other, bypass | allow, lock kept          | allow, lock removed    |
/// | held by other         | deny                      | deny                   |
pub async fn check_on_write<S: LockStore>(
    store: &S,
    settings: &LockSettings,
    key: &LockKey,
    requester_id: DbId,
    action: WriteAction,
    bypass: bool,
) -> Result<WriteDecision, CoreError> {
    if settings.disabled && action == WriteAction::Update {
        return Ok(WriteDecision::Allow { released: None });
    }

    let Some(lock) = store.find(key).await.map_err(CoreError::store)? else {
        return Ok(WriteDecision::Allow { released: None });
    };

    // Deletes clear residual locks even when the feature is off, so that
    // disabling it never leaves orphaned rows behind.
    if settings.disabled {
        let released = remove(store, lock).await?;
        return Ok(WriteDecision::Allow { released });
    }

    if lock.is_owned_by(requester_id) {
        tracing::debug!(
            user_id = requester_id,
            entity_kind = %key.entity_kind,
            entity_id = key.entity_id,
            action = %action,
            "Owner write clears content lock"
        );
        let released = remove(store, lock).await?;
        return Ok(WriteDecision::Allow { released });
    }

    if bypass {
        tracing::info!(
            user_id = requester_id,
            owner_id = lock.owner_id,
            entity_kind = %key.entity_kind,
            entity_id = key.entity_id,
            action = %action,
            "Content lock bypassed"
        );
        return match action {
            // The displaced owner keeps the lock and will meet the same check
            // when saving.
            WriteAction::Update => Ok(WriteDecision::AllowBypassed {
                lock,
                lock_removed: false,
            }),
            WriteAction::Delete => {
                let lock_removed = store.delete(lock.id).await.map_err(CoreError::store)?;
                Ok(WriteDecision::AllowBypassed { lock, lock_removed })
            }
        };
    }

    tracing::warn!(
        user_id = requester_id,
        owner_id = lock.owner_id,
        entity_kind = %key.entity_kind,
        entity_id = key.entity_id,
        action = %action,
        locked_since = %lock.created_at,
        "Write denied: content is locked by another user"
    );
    Ok(WriteDecision::Deny(lock.conflict()))
}

async fn remove<S: LockStore>(store: &S, lock: LockRecord) -> Result<Option<LockRecord>, CoreError> {
    let removed = store.delete(lock.id).await.map_err(CoreError::store)?;
    Ok(removed.then_some(lock))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::content_lock::memory::MemoryLockStore;
    use crate::content_lock::model::{LockConflict, LockOutcome, NewLock};
    use crate::content_lock::registry::LockRegistry;

    const USER_A: DbId = 1;
    const USER_B: DbId = 2;

    fn enabled() -> LockSettings {
        LockSettings {
            disabled: false,
            ttl_seconds: 3600,
        }
    }

    fn disabled() -> LockSettings {
        LockSettings {
            disabled: true,
            ttl_seconds: 3600,
        }
    }

    fn item(id: DbId) -> LockKey {
        LockKey::new("items", id)
    }

    async fn locked_by(owner_id: DbId) -> MemoryLockStore {
        let store = MemoryLockStore::new();
        store
            .insert_if_absent(NewLock {
                key: item(42),
                owner_id,
                created_at: Utc::now() - Duration::minutes(3),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn no_lock_allows_without_side_effect() {
        let store = MemoryLockStore::new();
        for action in [WriteAction::Update, WriteAction::Delete] {
            let decision = check_on_write(&store, &enabled(), &item(42), USER_A, action, false)
                .await
                .unwrap();
            assert_eq!(decision, WriteDecision::Allow { released: None });
        }
    }

    #[tokio::test]
    async fn owner_update_clears_lock() {
        let store = locked_by(USER_A).await;
        let decision =
            check_on_write(&store, &enabled(), &item(42), USER_A, WriteAction::Update, false)
                .await
                .unwrap();
        assert_matches!(decision, WriteDecision::Allow { released: Some(r) } if r.owner_id == USER_A);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn owner_delete_clears_lock() {
        let store = locked_by(USER_A).await;
        let decision =
            check_on_write(&store, &enabled(), &item(42), USER_A, WriteAction::Delete, false)
                .await
                .unwrap();
        assert_matches!(decision, WriteDecision::Allow { released: Some(_) });
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn other_user_is_denied_and_lock_untouched() {
        let store = locked_by(USER_A).await;
        let before = store.records();
        for action in [WriteAction::Update, WriteAction::Delete] {
            let decision = check_on_write(&store, &enabled(), &item(42), USER_B, action, false)
                .await
                .unwrap();
            assert_matches!(
                &decision,
                WriteDecision::Deny(LockConflict { owner_id: USER_A, entity_id: 42, .. })
            );
            assert_matches!(decision.into_result(), Err(CoreError::ContentLocked(_)));
        }
        assert_eq!(store.records(), before);
    }

    #[tokio::test]
    async fn bypassed_update_keeps_owner_lock() {
        let store = locked_by(USER_A).await;
        let before = store.records();
        let decision =
            check_on_write(&store, &enabled(), &item(42), USER_B, WriteAction::Update, true)
                .await
                .unwrap();
        assert_matches!(
            decision,
            WriteDecision::AllowBypassed { lock_removed: false, ref lock } if lock.owner_id == USER_A
        );
        assert_eq!(store.records(), before);
    }

    #[tokio::test]
    async fn bypassed_delete_removes_lock() {
        let store = locked_by(USER_A).await;
        let decision =
            check_on_write(&store, &enabled(), &item(42), USER_B, WriteAction::Delete, true)
                .await
                .unwrap();
        assert_matches!(decision, WriteDecision::AllowBypassed { lock_removed: true, .. });
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn disabled_update_skips_check() {
        let store = locked_by(USER_A).await;
        let decision =
            check_on_write(&store, &disabled(), &item(42), USER_B, WriteAction::Update, false)
                .await
                .unwrap();
        assert_eq!(decision, WriteDecision::Allow { released: None });
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn disabled_delete_still_clears_lock_of_other_user() {
        let store = locked_by(USER_A).await;
        let decision =
            check_on_write(&store, &disabled(), &item(42), USER_B, WriteAction::Delete, false)
                .await
                .unwrap();
        assert_matches!(decision, WriteDecision::Allow { released: Some(r) } if r.owner_id == USER_A);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn check_does_not_sweep_expired_locks() {
        let store = MemoryLockStore::new();
        store
            .insert_if_absent(NewLock {
                key: item(42),
                owner_id: USER_A,
                created_at: Utc::now() - Duration::hours(5),
            })
            .await
            .unwrap();
        let decision =
            check_on_write(&store, &enabled(), &item(42), USER_B, WriteAction::Update, false)
                .await
                .unwrap();
        assert!(!decision.is_allowed());
    }

    /// The end-to-end sequence of two users working on item 42.
    #[tokio::test]
    async fn two_user_editing_scenario() {
        let store = MemoryLockStore::new();
        let registry = LockRegistry::new(store.clone());
        let settings = enabled();
        let key = item(42);

        let first = registry.acquire(&settings, &key, USER_A).await.unwrap();
        let LockOutcome::Acquired { lock: created } = first else {
            panic!("expected Acquired, got {first:?}");
        };
        assert_eq!(created.owner_id, USER_A);

        let again = registry.acquire(&settings, &key, USER_A).await.unwrap();
        let LockOutcome::SelfAlreadyLocked { lock: refreshed, .. } = again else {
            panic!("expected SelfAlreadyLocked, got {again:?}");
        };
        assert_eq!(refreshed.id, created.id);
        assert!(refreshed.created_at >= created.created_at);
        let t0 = refreshed.created_at;

        let other = registry.acquire(&settings, &key, USER_B).await.unwrap();
        assert_matches!(
            other,
            LockOutcome::HeldByOther { lock: r } if r.owner_id == USER_A && r.created_at == t0
        );

        let denied = registry
            .check_on_write(&settings, &key, USER_B, WriteAction::Update, false)
            .await
            .unwrap();
        assert_eq!(
            denied,
            WriteDecision::Deny(LockConflict {
                entity_kind: "items".to_string(),
                entity_id: 42,
                owner_id: USER_A,
                locked_since: t0,
            })
        );

        let bypassed = registry
            .check_on_write(&settings, &key, USER_B, WriteAction::Update, true)
            .await
            .unwrap();
        assert_matches!(bypassed, WriteDecision::AllowBypassed { lock_removed: false, .. });
        assert_eq!(store.records()[0].owner_id, USER_A);

        let saved = registry
            .check_on_write(&settings, &key, USER_A, WriteAction::Update, false)
            .await
            .unwrap();
        assert_matches!(saved, WriteDecision::Allow { released: Some(_) });
        assert!(store.is_empty());
    }
}
