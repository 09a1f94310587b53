//! Input of the content lock maintenance job.
//!
//! The job runner supplies `{ mode, max_age_hours, owner_ids }`. Ages arrive
//! in hours and are converted to seconds here. Malformed ages never fail the
//! job: they become [`MaxAge::Invalid`], which matches no lock at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::DbId;

/// Count matching locks without deleting them.
pub const MODE_CHECK: &str = "check";
/// Delete matching locks.
pub const MODE_CLEAN: &str = "clean";

/// Process names used by the admin task form for the two modes.
pub const PROCESS_CHECK: &str = "lockedit_db_content_lock_check";
pub const PROCESS_CLEAN: &str = "lockedit_db_content_lock_clean";

/// Seconds per hour.
const SECS_PER_HOUR: f64 = 3600.0;

/// Maintenance job mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanMode {
    Check,
    Clean,
}

impl CleanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => MODE_CHECK,
            Self::Clean => MODE_CLEAN,
        }
    }

    /// Parse a mode, accepting the short names and the task process names.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            MODE_CHECK | PROCESS_CHECK => Ok(Self::Check),
            MODE_CLEAN | PROCESS_CLEAN => Ok(Self::Clean),
            other => Err(CoreError::Validation(format!(
                "Unknown cleanup mode '{other}'. Must be one of: {MODE_CHECK}, {MODE_CLEAN}"
            ))),
        }
    }
}

impl fmt::Display for CleanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age threshold of a bulk cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    /// Locks at least this many seconds old. `0` means every lock.
    Seconds(i64),
    /// The supplied age was not a usable number.
    Invalid,
}

impl MaxAge {
    /// Convert an age in hours. Negative or non-finite values are invalid.
    pub fn from_hours(hours: f64) -> Self {
        if !hours.is_finite() || hours < 0.0 {
            return Self::Invalid;
        }
        let secs = (hours * SECS_PER_HOUR).round();
        if secs >= i64::MAX as f64 {
            return Self::Invalid;
        }
        Self::Seconds(secs as i64)
    }

    /// Interpret a raw JSON value as an age in hours.
    ///
    /// Numbers and numeric strings are accepted; anything else (including a
    /// missing value) is [`MaxAge::Invalid`].
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Invalid, Self::from_hours),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_or(Self::Invalid, Self::from_hours),
            _ => Self::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Seconds(s) if *s >= 0)
    }
}

/// Raw maintenance job request as supplied by the job runner.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanJobRequest {
    pub mode: String,
    /// Kept raw so that malformed input degrades to "match nothing" instead
    /// of a deserialization failure.
    #[serde(default, alias = "hours")]
    pub max_age_hours: Option<Value>,
    #[serde(default, alias = "user_id")]
    pub owner_ids: Option<Vec<DbId>>,
}

/// Validated maintenance job parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanJob {
    pub mode: CleanMode,
    pub max_age: MaxAge,
    pub owner_ids: Vec<DbId>,
}

impl CleanJobRequest {
    /// Validate the request. Only an unknown mode is an error.
    pub fn into_job(self) -> Result<CleanJob, CoreError> {
        let mode = CleanMode::parse(&self.mode)?;
        let max_age = MaxAge::from_json(self.max_age_hours.as_ref());
        let mut owner_ids = self.owner_ids.unwrap_or_default();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        Ok(CleanJob {
            mode,
            max_age,
            owner_ids,
        })
    }
}
