pub mod admin;
pub mod health;
pub mod locks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /locks/acquire                               acquire or refresh (POST)
/// /locks/release                               release own lock (POST)
/// /locks/check-write                           pre-commit check (POST)
/// /locks/{entity_kind}/{entity_id}             inspect (GET)
///
/// /admin/locks/maintenance                     check / clean (POST, admin only)
/// /admin/users/{id}/locks                      remove a user's locks (DELETE, admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/locks", locks::router())
        .nest("/admin", admin::router())
}
