//! Admin route definitions. Every handler requires the `admin` role.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::maintenance;
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// POST   /locks/maintenance               -> run_maintenance
/// DELETE /users/{id}/locks                -> delete_user_locks
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locks/maintenance", post(maintenance::run_maintenance))
        .route("/users/{id}/locks", delete(maintenance::delete_user_locks))
}
