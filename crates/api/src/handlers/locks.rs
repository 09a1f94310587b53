//! Handlers for content locks.
//!
//! The host CMS calls these from its view and write hooks:
//! - edit view opened -> `acquire_lock`
//! - delete confirmation opened -> `inspect_lock`
//! - update or delete about to commit -> `check_write`
//! - editor closed without saving -> `release_lock`

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use lockedit_core::content_lock::{lock_key, LockOutcome, LockRecord, WriteAction, WriteDecision};
use lockedit_core::notice::{self, Notice};
use lockedit_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /locks/acquire`.
#[derive(Debug, Deserialize)]
pub struct AcquireLockRequest {
    pub entity_kind: String,
    pub entity_id: DbId,
    /// Set when the edit form is re-rendered after a failed submit.
    #[serde(default)]
    pub resubmitted: bool,
}

/// Body of `POST /locks/release`.
#[derive(Debug, Deserialize)]
pub struct ReleaseLockRequest {
    pub entity_kind: String,
    pub entity_id: DbId,
}

/// Body of `POST /locks/check-write`.
#[derive(Debug, Deserialize)]
pub struct CheckWriteRequest {
    pub entity_kind: String,
    pub entity_id: DbId,
    pub action: WriteAction,
    /// The user ticked "save or delete anyway" on the form.
    #[serde(default)]
    pub bypass: bool,
}

#[derive(Debug, Serialize)]
pub struct AcquireLockResponse {
    pub outcome: LockOutcome,
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
pub struct InspectLockResponse {
    pub lock: Option<LockRecord>,
    pub held_by_self: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
pub struct CheckWriteResponse {
    pub result: WriteDecision,
    pub notice: Option<Notice>,
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// POST /api/v1/locks/acquire
///
/// Claim or refresh the lock for the caller. Never fails because someone
/// else holds it; the outcome says who does.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<AcquireLockRequest>,
) -> AppResult<impl IntoResponse> {
    let key = lock_key(&input.entity_kind, input.entity_id)?;

    let outcome = state
        .locks
        .acquire(state.lock_settings(), &key, auth.user_id)
        .await?;

    if let LockOutcome::HeldByOther { lock } = &outcome {
        tracing::debug!(
            user_id = auth.user_id,
            owner_id = lock.owner_id,
            entity_kind = %key.entity_kind,
            entity_id = key.entity_id,
            "Edit view opened on content locked by another user"
        );
    }

    let notice = notice::for_acquire(&outcome, input.resubmitted);
    Ok(Json(DataResponse {
        data: AcquireLockResponse { outcome, notice },
    }))
}

/// GET /api/v1/locks/{entity_kind}/{entity_id}
///
/// Current lock for a delete confirmation view. Does not create or refresh
/// a lock.
pub async fn inspect_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_kind, entity_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let key = lock_key(&entity_kind, entity_id)?;

    let lock = state.locks.inspect(state.lock_settings(), &key).await?;
    let held_by_self = lock.as_ref().is_some_and(|l| l.is_owned_by(auth.user_id));
    let notice = notice::for_delete_confirm(lock.as_ref(), auth.user_id);

    Ok(Json(DataResponse {
        data: InspectLockResponse {
            lock,
            held_by_self,
            notice,
        },
    }))
}

/// POST /api/v1/locks/release
///
/// Release the caller's own lock. Returns 400 if the caller holds none.
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ReleaseLockRequest>,
) -> AppResult<impl IntoResponse> {
    let key = lock_key(&input.entity_kind, input.entity_id)?;

    let released = state
        .locks
        .release(&key, auth.user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("You do not hold a lock on this content".into()))?;

    Ok(Json(DataResponse { data: released }))
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// POST /api/v1/locks/check-write
///
/// Decide whether an update or delete may commit. Returns 409
/// `CONTENT_LOCKED` when another user holds the lock and no bypass was
/// requested; the host must then abort the write.
pub async fn check_write(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CheckWriteRequest>,
) -> AppResult<impl IntoResponse> {
    let key = lock_key(&input.entity_kind, input.entity_id)?;

    let decision = state
        .locks
        .check_on_write(
            state.lock_settings(),
            &key,
            auth.user_id,
            input.action,
            input.bypass,
        )
        .await?
        .into_result()?;

    let notice = notice::for_write(&decision, input.action, auth.user_id);
    Ok(Json(DataResponse {
        data: CheckWriteResponse {
            result: decision,
            notice,
        },
    }))
}
