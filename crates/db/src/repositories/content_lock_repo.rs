//! Repository for the `content_locks` table.

use lockedit_core::content_lock::{AgeBound, LockFilter, LockKey, NewLock};
use lockedit_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::content_lock::ContentLock;

/// Column list for `content_locks` queries.
const LOCK_COLUMNS: &str = "id, entity_id, entity_kind, user_id, created_at, updated_at";

/// Shared predicate of the bulk queries.
///
/// `$1` exclusive cutoff, `$2` inclusive cutoff, `$3` owner ids (empty means
/// any owner).
const FILTER_PREDICATE: &str = "($1::TIMESTAMPTZ IS NULL OR created_at < $1) \
                                AND ($2::TIMESTAMPTZ IS NULL OR created_at <= $2) \
                                AND (cardinality($3::BIGINT[]) = 0 OR user_id = ANY($3))";

/// Provides queries for advisory content locks.
pub struct ContentLockRepo;

impl ContentLockRepo {
    /// Get the lock on an entity, or `None` if it is free.
    pub async fn find(pool: &PgPool, key: &LockKey) -> Result<Option<ContentLock>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCK_COLUMNS} FROM content_locks \
             WHERE entity_id = $1 AND entity_kind = $2"
        );
        sqlx::query_as::<_, ContentLock>(&query)
            .bind(key.entity_id)
            .bind(&key.entity_kind)
            .fetch_optional(pool)
            .await
    }

    /// Insert a lock unless the entity is already locked.
    ///
    /// Uses `INSERT ... ON CONFLICT DO NOTHING` against
    /// `uq_content_locks_entity`. Returns `None` when another row holds the
    /// key; the caller re-reads it.
    pub async fn insert_if_absent(
        pool: &PgPool,
        lock: &NewLock,
    ) -> Result<Option<ContentLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_locks (entity_id, entity_kind, user_id, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_content_locks_entity DO NOTHING \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, ContentLock>(&query)
            .bind(lock.key.entity_id)
            .bind(&lock.key.entity_kind)
            .bind(lock.owner_id)
            .bind(lock.created_at)
            .fetch_optional(pool)
            .await
    }

    /// Move `created_at` forward to `at`; an older `at` leaves it unchanged.
    pub async fn refresh(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<ContentLock>, sqlx::Error> {
        let query = format!(
            "UPDATE content_locks SET created_at = GREATEST(created_at, $2) \
             WHERE id = $1 \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, ContentLock>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Delete one lock. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_locks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_matching(pool: &PgPool, filter: &LockFilter) -> Result<u64, sqlx::Error> {
        let (before, at_or_before) = cutoffs(&filter.age);
        let query = format!("SELECT COUNT(*) FROM content_locks WHERE {FILTER_PREDICATE}");
        let count: i64 = sqlx::query_scalar(&query)
            .bind(before)
            .bind(at_or_before)
            .bind(&filter.owner_ids)
            .fetch_one(pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Delete every lock matching `filter`. Returns the number removed.
    pub async fn delete_matching(pool: &PgPool, filter: &LockFilter) -> Result<u64, sqlx::Error> {
        let (before, at_or_before) = cutoffs(&filter.age);
        let query = format!("DELETE FROM content_locks WHERE {FILTER_PREDICATE}");
        let result = sqlx::query(&query)
            .bind(before)
            .bind(at_or_before)
            .bind(&filter.owner_ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Split an [`AgeBound`] into the `($1, $2)` binds of [`FILTER_PREDICATE`].
fn cutoffs(age: &AgeBound) -> (Option<Timestamp>, Option<Timestamp>) {
    match *age {
        AgeBound::Any => (None, None),
        AgeBound::Before(ts) => (Some(ts), None),
        AgeBound::AtOrBefore(ts) => (None, Some(ts)),
    }
}
