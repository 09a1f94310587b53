//! Lock records, keys, and the structured outcomes of the lock protocols.

use std::fmt;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Keys and records
// ---------------------------------------------------------------------------

/// Logical identity of a lockable resource: `(entity_kind, entity_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub entity_kind: String,
    pub entity_id: DbId,
}

impl LockKey {
    pub fn new(entity_kind: impl Into<String>, entity_id: DbId) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            entity_id,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.entity_kind, self.entity_id)
    }
}

/// A persisted content lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Surrogate id assigned by the store.
    pub id: DbId,
    pub entity_id: DbId,
    pub entity_kind: String,
    /// The user holding the lock.
    pub owner_id: DbId,
    /// Creation or last refresh time; the only input to expiry.
    pub created_at: Timestamp,
}

impl LockRecord {
    pub fn key(&self) -> LockKey {
        LockKey::new(self.entity_kind.clone(), self.entity_id)
    }

    pub fn is_owned_by(&self, user_id: DbId) -> bool {
        self.owner_id == user_id
    }

    /// The conflict raised when someone other than the owner writes.
    pub fn conflict(&self) -> LockConflict {
        LockConflict {
            entity_kind: self.entity_kind.clone(),
            entity_id: self.entity_id,
            owner_id: self.owner_id,
            locked_since: self.created_at,
        }
    }
}

/// A lock about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLock {
    pub key: LockKey,
    pub owner_id: DbId,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Details of a write denied because another user holds the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConflict {
    pub entity_kind: String,
    pub entity_id: DbId,
    pub owner_id: DbId,
    pub locked_since: Timestamp,
}

impl fmt::Display for LockConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} is being edited by user #{} since {}",
            self.entity_kind,
            self.entity_id,
            self.owner_id,
            self.locked_since.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl From<LockConflict> for CoreError {
    fn from(conflict: LockConflict) -> Self {
        CoreError::ContentLocked(conflict)
    }
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Result of acquiring a lock when an edit view is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LockOutcome {
    /// A new lock was created for the requester.
    Acquired { lock: LockRecord },
    /// The requester already held the lock; its timestamp was refreshed.
    /// `previous_since` is the timestamp before the refresh.
    SelfAlreadyLocked {
        lock: LockRecord,
        previous_since: Timestamp,
    },
    /// Another user holds the lock. Nothing was changed.
    HeldByOther { lock: LockRecord },
    /// The lock could not be established because of an internal race or
    /// store failure. Editing proceeds unlocked.
    Unavailable,
    /// Content locking is administratively disabled.
    Disabled,
}

impl LockOutcome {
    /// The lock the outcome refers to, if any.
    pub fn lock(&self) -> Option<&LockRecord> {
        match self {
            Self::Acquired { lock }
            | Self::SelfAlreadyLocked { lock, .. }
            | Self::HeldByOther { lock } => Some(lock),
            Self::Unavailable | Self::Disabled => None,
        }
    }

    /// Whether the view must offer a bypass control.
    pub fn is_held_by_other(&self) -> bool {
        matches!(self, Self::HeldByOther { .. })
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// The kind of mutation being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Update,
    Delete,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision of the conflict guard for a pending write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum WriteDecision {
    /// The write may proceed. `released` is the lock removed as a side
    /// effect, if any.
    Allow { released: Option<LockRecord> },
    /// The write may proceed over another user's lock. For updates the lock
    /// is kept for its owner; for deletes it is removed.
    AllowBypassed {
        lock: LockRecord,
        lock_removed: bool,
    },
    /// The write must be rejected entirely.
    Deny(LockConflict),
}

impl WriteDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny(_))
    }

    /// Turn a denial into [`CoreError::ContentLocked`].
    pub fn into_result(self) -> Result<Self, CoreError> {
        match self {
            Self::Deny(conflict) => Err(conflict.into()),
            other => Ok(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Age restriction of a predicate-based query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBound {
    /// No age restriction.
    Any,
    /// `created_at < cutoff` (expiry sweep).
    Before(Timestamp),
    /// `created_at <= cutoff` (administrative cleanup).
    AtOrBefore(Timestamp),
}

impl AgeBound {
    pub fn admits(&self, created_at: Timestamp) -> bool {
        match *self {
            Self::Any => true,
            Self::Before(cutoff) => created_at < cutoff,
            Self::AtOrBefore(cutoff) => created_at <= cutoff,
        }
    }
}

/// Predicate for bulk count / delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFilter {
    pub age: AgeBound,
    /// Restrict to these owners. Empty means every owner.
    pub owner_ids: Vec<DbId>,
}

impl LockFilter {
    /// Every lock record.
    pub fn all() -> Self {
        Self {
            age: AgeBound::Any,
            owner_ids: Vec::new(),
        }
    }

    /// Every lock held by `owner_id`.
    pub fn owned_by(owner_id: DbId) -> Self {
        Self {
            age: AgeBound::Any,
            owner_ids: vec![owner_id],
        }
    }

    pub fn matches(&self, record: &LockRecord) -> bool {
        self.age.admits(record.created_at)
            && (self.owner_ids.is_empty() || self.owner_ids.contains(&record.owner_id))
    }
}
