//! In-process [`LockStore`] backed by a hash map.
//!
//! Each operation holds the map's mutex for the duration of one call only,
//! which gives the same single-statement atomicity a database unique
//! constraint gives. Useful for tests and single-process hosts.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::model::{LockFilter, LockKey, LockRecord, NewLock};
use super::store::{InsertOutcome, LockStore};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Default)]
struct Table {
    next_id: DbId,
    rows: HashMap<LockKey, LockRecord>,
}

/// Shared in-memory lock table. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.table().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records, ordered by id.
    pub fn records(&self) -> Vec<LockRecord> {
        let mut rows: Vec<LockRecord> = self.table().rows.values().cloned().collect();
        rows.sort_by_key(|r| r.id);
        rows
    }
}

impl LockStore for MemoryLockStore {
    type Error = Infallible;

    async fn find(&self, key: &LockKey) -> Result<Option<LockRecord>, Infallible> {
        Ok(self.table().rows.get(key).cloned())
    }

    async fn insert_if_absent(&self, lock: NewLock) -> Result<InsertOutcome, Infallible> {
        let mut table = self.table();
        if let Some(existing) = table.rows.get(&lock.key) {
            return Ok(InsertOutcome::AlreadyExists(existing.clone()));
        }
        table.next_id += 1;
        let record = LockRecord {
            id: table.next_id,
            entity_id: lock.key.entity_id,
            entity_kind: lock.key.entity_kind.clone(),
            owner_id: lock.owner_id,
            created_at: lock.created_at,
        };
        table.rows.insert(lock.key, record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    async fn refresh(&self, id: DbId, at: Timestamp) -> Result<Option<LockRecord>, Infallible> {
        let mut table = self.table();
        let Some(record) = table.rows.values_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if at > record.created_at {
            record.created_at = at;
        }
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, Infallible> {
        let mut table = self.table();
        let before = table.rows.len();
        table.rows.retain(|_, r| r.id != id);
        Ok(table.rows.len() < before)
    }

    async fn count_matching(&self, filter: &LockFilter) -> Result<u64, Infallible> {
        let count = self.table().rows.values().filter(|r| filter.matches(r)).count();
        Ok(count as u64)
    }

    async fn delete_matching(&self, filter: &LockFilter) -> Result<u64, Infallible> {
        let mut table = self.table();
        let before = table.rows.len();
        table.rows.retain(|_, r| !filter.matches(r));
        Ok((before - table.rows.len()) as u64)
    }
}
