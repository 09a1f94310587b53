use std::sync::Arc;

use lockedit_core::content_lock::LockRegistry;
use lockedit_core::settings::LockSettings;
use lockedit_db::PgLockStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool and the lock store share one connection pool.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: lockedit_db::DbPool,
    /// Server configuration, including the content lock settings.
    pub config: Arc<ServerConfig>,
    /// Content lock engine over the `content_locks` table.
    pub locks: LockRegistry<PgLockStore>,
}

impl AppState {
    pub fn new(pool: lockedit_db::DbPool, config: ServerConfig) -> Self {
        Self {
            locks: LockRegistry::new(PgLockStore::new(pool.clone())),
            pool,
            config: Arc::new(config),
        }
    }

    /// Content lock settings in effect.
    pub fn lock_settings(&self) -> &LockSettings {
        &self.config.locks
    }
}
