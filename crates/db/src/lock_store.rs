//! [`LockStore`] backed by the `content_locks` table.

use lockedit_core::content_lock::{
    InsertOutcome, LockFilter, LockKey, LockRecord, LockStore, NewLock,
};
use lockedit_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::repositories::ContentLockRepo;

/// Postgres lock store. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LockStore for PgLockStore {
    type Error = sqlx::Error;

    async fn find(&self, key: &LockKey) -> Result<Option<LockRecord>, sqlx::Error> {
        let row = ContentLockRepo::find(&self.pool, key).await?;
        Ok(row.map(LockRecord::from))
    }

    async fn insert_if_absent(&self, lock: NewLock) -> Result<InsertOutcome, sqlx::Error> {
        if let Some(row) = ContentLockRepo::insert_if_absent(&self.pool, &lock).await? {
            return Ok(InsertOutcome::Inserted(row.into()));
        }
        // The conflicting row may have been deleted between the two
        // statements.
        let outcome = match ContentLockRepo::find(&self.pool, &lock.key).await? {
            Some(winner) => InsertOutcome::AlreadyExists(winner.into()),
            None => InsertOutcome::Vanished,
        };
        Ok(outcome)
    }

    async fn refresh(&self, id: DbId, at: Timestamp) -> Result<Option<LockRecord>, sqlx::Error> {
        let row = ContentLockRepo::refresh(&self.pool, id, at).await?;
        Ok(row.map(LockRecord::from))
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        ContentLockRepo::delete(&self.pool, id).await
    }

    async fn count_matching(&self, filter: &LockFilter) -> Result<u64, sqlx::Error> {
        ContentLockRepo::count_matching(&self.pool, filter).await
    }

    async fn delete_matching(&self, filter: &LockFilter) -> Result<u64, sqlx::Error> {
        ContentLockRepo::delete_matching(&self.pool, filter).await
    }
}
