//! Persistence seam for lock records.
//!
//! Implementations must make [`LockStore::insert_if_absent`] atomic at the
//! storage layer (a unique constraint on the key plus conflict detection).
//! The engine never emulates it with a read followed by a write.

use std::fmt::Display;
use std::future::Future;

use super::model::{LockFilter, LockKey, LockRecord, NewLock};
use crate::types::{DbId, Timestamp};

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The new record was stored.
    Inserted(LockRecord),
    /// Another record already holds the key; the caller's record was
    /// discarded and this is the winner as read back.
    AlreadyExists(LockRecord),
    /// The key was taken, but the winning record disappeared before it
    /// could be read back.
    Vanished,
}

/// Keyed table of lock records.
///
/// Every method is a single-statement operation on the backing store.
pub trait LockStore: Send + Sync {
    type Error: Display + Send;

    /// Find the record for a key.
    fn find(
        &self,
        key: &LockKey,
    ) -> impl Future<Output = Result<Option<LockRecord>, Self::Error>> + Send;

    /// Insert `lock` unless a record already exists for its key.
    fn insert_if_absent(
        &self,
        lock: NewLock,
    ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send;

    /// Move a record's `created_at` forward to `at`. Never moves it back.
    ///
    /// Returns the updated record, or `None` if it no longer exists.
    fn refresh(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<LockRecord>, Self::Error>> + Send;

    /// Delete one record by id. Returns `true` if a row was removed.
    fn delete(&self, id: DbId) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Count records matching `filter`.
    fn count_matching(
        &self,
        filter: &LockFilter,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Delete records matching `filter`. Returns the number removed.
    fn delete_matching(
        &self,
        filter: &LockFilter,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
