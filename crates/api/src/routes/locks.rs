//! Route definitions for content locks.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock routes mounted at `/locks`.
///
/// ```text
/// POST /acquire                          -> acquire_lock
/// POST /release                          -> release_lock
/// POST /check-write                      -> check_write
/// GET  /{entity_kind}/{entity_id}        -> inspect_lock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/acquire", post(locks::acquire_lock))
        .route("/release", post(locks::release_lock))
        .route("/check-write", post(locks::check_write))
        .route("/{entity_kind}/{entity_id}", get(locks::inspect_lock))
}
