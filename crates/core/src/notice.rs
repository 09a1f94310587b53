//! User-facing notices for lock outcomes.
//!
//! The host renders these next to edit and delete views. Translation is the
//! host's concern; dates are rendered as RFC 3339 UTC.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::content_lock::model::{LockConflict, LockOutcome, LockRecord, WriteAction, WriteDecision};
use crate::types::{DbId, Timestamp};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A message for the user, plus whether the view should offer a bypass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub offer_bypass: bool,
}

impl Notice {
    fn warning(message: String) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message,
            offer_bypass: false,
        }
    }
}

fn format_date(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn locked_by_other(owner_id: DbId, since: Timestamp) -> String {
    format!(
        "This content is being edited by user #{owner_id} and is therefore locked to prevent \
         changes by other users. The lock has been in place since {}.",
        format_date(since)
    )
}

/// Message of a denied write, identical for interactive and API callers.
pub fn conflict_message(conflict: &LockConflict) -> String {
    locked_by_other(conflict.owner_id, conflict.locked_since)
}

/// Notice for an edit view after [`LockOutcome`].
///
/// `resubmitted` marks a form post that came back to the view (e.g. after a
/// validation error); the lock warning is then raised to an error.
pub fn for_acquire(outcome: &LockOutcome, resubmitted: bool) -> Option<Notice> {
    match outcome {
        LockOutcome::SelfAlreadyLocked { previous_since, .. } => Some(Notice::warning(format!(
            "You are already editing this resource elsewhere since {}.",
            format_date(*previous_since)
        ))),
        LockOutcome::HeldByOther { lock } => Some(Notice {
            level: if resubmitted {
                NoticeLevel::Error
            } else {
                NoticeLevel::Warning
            },
            message: locked_by_other(lock.owner_id, lock.created_at),
            offer_bypass: true,
        }),
        LockOutcome::Acquired { .. } | LockOutcome::Unavailable | LockOutcome::Disabled => None,
    }
}

/// Notice for a delete confirmation view showing the current lock.
pub fn for_delete_confirm(lock: Option<&LockRecord>, requester_id: DbId) -> Option<Notice> {
    let lock = lock?;
    if lock.is_owned_by(requester_id) {
        return Some(Notice::warning(format!(
            "You are editing this resource elsewhere since {}.",
            format_date(lock.created_at)
        )));
    }
    Some(Notice {
        level: NoticeLevel::Error,
        message: locked_by_other(lock.owner_id, lock.created_at),
        offer_bypass: true,
    })
}

/// Notice for the result of a write check.
pub fn for_write(decision: &WriteDecision, action: WriteAction, requester_id: DbId) -> Option<Notice> {
    match (decision, action) {
        (WriteDecision::Allow { released: Some(lock) }, WriteAction::Delete)
            if lock.is_owned_by(requester_id) =>
        {
            Some(Notice::warning(format!(
                "You removed the resource you were editing elsewhere since {}.",
                format_date(lock.created_at)
            )))
        }
        (WriteDecision::Allow { .. }, _) => None,
        (WriteDecision::AllowBypassed { lock, .. }, WriteAction::Update) => {
            Some(Notice::warning(format!(
                "The lock in place since {} has been bypassed, but user #{} can still override \
                 it on save.",
                format_date(lock.created_at),
                lock.owner_id
            )))
        }
        (WriteDecision::AllowBypassed { lock, .. }, WriteAction::Delete) => {
            Some(Notice::warning(format!(
                "You removed a resource currently locked for editing by user #{} since {}.",
                lock.owner_id,
                format_date(lock.created_at)
            )))
        }
        (WriteDecision::Deny(conflict), _) => Some(Notice {
            level: NoticeLevel::Error,
            message: conflict_message(conflict),
            offer_bypass: true,
        }),
    }
}
