//! Admin handlers for content lock maintenance.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use lockedit_core::error::CoreError;
use lockedit_core::maintenance::{CleanJobRequest, CleanMode};
use lockedit_core::types::DbId;
use lockedit_db::repositories::UserRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of a maintenance run. Exactly one of `matched` (check) and
/// `removed` (clean) is present.
#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub mode: CleanMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UserLocksRemoved {
    pub user_id: DbId,
    pub removed: u64,
}

/// POST /api/v1/admin/locks/maintenance
///
/// Count or delete locks at least `max_age_hours` old, optionally limited to
/// `owner_ids`. An unusable age matches nothing.
pub async fn run_maintenance(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CleanJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job = input.into_job()?;
    if !job.max_age.is_valid() {
        tracing::warn!(
            user_id = admin.user_id,
            mode = %job.mode,
            "Maintenance job has no usable max age; nothing will match"
        );
    }

    let count = state.locks.bulk_clean(&job).await?;

    tracing::info!(
        user_id = admin.user_id,
        mode = %job.mode,
        count,
        "Content lock maintenance run"
    );

    let (matched, removed) = match job.mode {
        CleanMode::Check => (Some(count), None),
        CleanMode::Clean => (None, Some(count)),
    };
    Ok(Json(DataResponse {
        data: MaintenanceResponse {
            mode: job.mode,
            matched,
            removed,
        },
    }))
}

/// DELETE /api/v1/admin/users/{id}/locks
///
/// Remove every lock held by a user, e.g. before the user is deleted in a
/// system whose user table is not linked by foreign key.
pub async fn delete_user_locks(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;

    let removed = state.locks.release_all_for_owner(user_id).await?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        removed,
        "Content locks of user removed by admin"
    );

    Ok(Json(DataResponse {
        data: UserLocksRemoved { user_id, removed },
    }))
}
