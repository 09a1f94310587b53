//! Content lock rows.

use lockedit_core::content_lock::LockRecord;
use lockedit_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `content_locks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentLock {
    pub id: DbId,
    pub entity_id: DbId,
    pub entity_kind: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ContentLock> for LockRecord {
    fn from(row: ContentLock) -> Self {
        LockRecord {
            id: row.id,
            entity_id: row.entity_id,
            entity_kind: row.entity_kind,
            owner_id: row.user_id,
            created_at: row.created_at,
        }
    }
}
