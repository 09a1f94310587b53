//! Administrative settings for content locking.
//!
//! The settings are a plain value passed into every engine call; there is no
//! process-wide singleton. [`LockSettings::from_env`] is the only place that
//! touches the environment.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default lock lifetime in seconds (4 hours).
pub const DEFAULT_LOCK_TTL_SECS: i64 = 14_400;

/// Env var that disables write-time conflict checking for updates.
pub const ENV_DISABLE: &str = "LOCKEDIT_DISABLE";

/// Legacy env var with inverted meaning (`false` disables locking).
///
/// Only consulted when [`ENV_DISABLE`] is absent.
pub const ENV_LEGACY_ENABLE: &str = "LOCKEDIT_ENABLE";

/// Env var holding the lock lifetime in seconds. `0` disables expiry.
pub const ENV_TTL_SECS: &str = "LOCKEDIT_TTL_SECS";

/// Content lock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    /// When `true`, edit views take no lock and updates skip the conflict
    /// check. Deletes still clear residual locks.
    pub disabled: bool,
    /// Idle lifetime of a lock in seconds. `0` (or negative) means locks
    /// never expire on their own.
    pub ttl_seconds: i64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            ttl_seconds: DEFAULT_LOCK_TTL_SECS,
        }
    }
}

impl LockSettings {
    /// Load settings from the environment, falling back to defaults.
    ///
    /// | Env Var              | Default  |
    /// |----------------------|----------|
    /// | `LOCKEDIT_DISABLE`   | `false`  |
    /// | `LOCKEDIT_ENABLE`    | (legacy) |
    /// | `LOCKEDIT_TTL_SECS`  | `14400`  |
    pub fn from_env() -> Result<Self, CoreError> {
        let disable = std::env::var(ENV_DISABLE).ok();
        let legacy_enable = std::env::var(ENV_LEGACY_ENABLE).ok();
        let ttl = std::env::var(ENV_TTL_SECS).ok();
        Self::from_vars(disable.as_deref(), legacy_enable.as_deref(), ttl.as_deref())
    }

    /// Build settings from raw variable values.
    pub fn from_vars(
        disable: Option<&str>,
        legacy_enable: Option<&str>,
        ttl_seconds: Option<&str>,
    ) -> Result<Self, CoreError> {
        let disabled = match (disable, legacy_enable) {
            (Some(v), _) => parse_flag(ENV_DISABLE, v)?,
            (None, Some(v)) => !parse_flag(ENV_LEGACY_ENABLE, v)?,
            (None, None) => false,
        };

        let ttl_seconds = match ttl_seconds.map(str::trim) {
            None | Some("") => DEFAULT_LOCK_TTL_SECS,
            Some(v) => v.parse::<i64>().map_err(|_| {
                CoreError::Validation(format!("{ENV_TTL_SECS} must be an integer, got '{v}'"))
            })?,
        };

        Ok(Self {
            disabled,
            ttl_seconds,
        })
    }

    /// Whether opportunistic expiry is active.
    pub fn expiry_enabled(&self) -> bool {
        self.ttl_seconds > 0
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, CoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CoreError::Validation(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}
