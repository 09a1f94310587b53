//! Soft editing locks on content resources.
//!
//! A lock is an advisory, time-limited claim by one user on one resource,
//! identified by `(entity_kind, entity_id)`. Opening an edit view acquires
//! it; saving or deleting is checked against it; stale locks are swept.
//!
//! - [`model`] -- records, keys, outcomes, filters.
//! - [`store`] -- the [`store::LockStore`] persistence seam.
//! - [`memory`] -- in-process store.
//! - [`registry`] -- acquire / inspect / release.
//! - [`guard`] -- write-time conflict check.
//! - [`sweeper`] -- expiry sweep and administrative cleanup.

pub mod guard;
pub mod memory;
pub mod model;
pub mod registry;
pub mod store;
pub mod sweeper;

use crate::error::CoreError;
use crate::types::DbId;

pub use model::{
    AgeBound, LockConflict, LockFilter, LockKey, LockOutcome, LockRecord, NewLock, WriteAction,
    WriteDecision,
};
pub use registry::LockRegistry;
pub use store::{InsertOutcome, LockStore};

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Entity kinds of the host CMS. The set is open: any well-formed kind can be
/// locked.
pub mod entity_kinds {
    pub const ITEMS: &str = "items";
    pub const ITEM_SETS: &str = "item_sets";
    pub const MEDIA: &str = "media";
}

/// Kinds the admin views lock out of the box.
pub const KNOWN_ENTITY_KINDS: &[&str] = &[
    entity_kinds::ITEMS,
    entity_kinds::ITEM_SETS,
    entity_kinds::MEDIA,
];

/// Maximum length of an entity kind tag.
pub const MAX_ENTITY_KIND_LEN: usize = 190;

/// Returns `true` if `kind` is one of [`KNOWN_ENTITY_KINDS`].
pub fn is_known_entity_kind(kind: &str) -> bool {
    KNOWN_ENTITY_KINDS.contains(&kind)
}

/// Validate an entity kind: non-empty, lowercase ASCII letters, digits and
/// underscores, at most [`MAX_ENTITY_KIND_LEN`] characters.
pub fn validate_entity_kind(kind: &str) -> Result<(), CoreError> {
    if kind.is_empty() {
        return Err(CoreError::Validation("entity_kind must not be empty".into()));
    }
    if kind.len() > MAX_ENTITY_KIND_LEN {
        return Err(CoreError::Validation(format!(
            "entity_kind must be at most {MAX_ENTITY_KIND_LEN} characters, got {}",
            kind.len()
        )));
    }
    if !kind
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(CoreError::Validation(format!(
            "Invalid entity_kind '{kind}'. Use lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Validate a lock key and build it.
pub fn lock_key(entity_kind: &str, entity_id: DbId) -> Result<LockKey, CoreError> {
    validate_entity_kind(entity_kind)?;
    if entity_id <= 0 {
        return Err(CoreError::Validation(format!(
            "entity_id must be positive, got {entity_id}"
        )));
    }
    if !is_known_entity_kind(entity_kind) {
        tracing::debug!(entity_kind, "Locking content of a kind outside the admin defaults");
    }
    Ok(LockKey::new(entity_kind, entity_id))
}
