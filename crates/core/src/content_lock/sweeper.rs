//! Expiry of stale locks.
//!
//! [`sweep_expired`] is the opportunistic sweep run before every acquire;
//! [`bulk_clean`] is the administrative cleanup used by the maintenance job.

use chrono::Duration;

use super::model::{AgeBound, LockFilter};
use super::store::LockStore;
use crate::error::CoreError;
use crate::maintenance::{CleanMode, MaxAge};
use crate::types::{DbId, Timestamp};

/// Delete every lock with `created_at < now - max_age_secs`.
///
/// A non-positive `max_age_secs` disables expiry and touches nothing.
pub async fn sweep_expired<S: LockStore>(
    store: &S,
    max_age_secs: i64,
    now: Timestamp,
) -> Result<u64, CoreError> {
    if max_age_secs <= 0 {
        return Ok(0);
    }
    let Some(cutoff) = cutoff(now, max_age_secs) else {
        return Ok(0);
    };

    let filter = LockFilter {
        age: AgeBound::Before(cutoff),
        owner_ids: Vec::new(),
    };
    let deleted = store.delete_matching(&filter).await.map_err(CoreError::store)?;

    if deleted > 0 {
        tracing::info!(deleted, max_age_secs, "Expired content locks removed");
    } else {
        tracing::debug!(max_age_secs, "No expired content locks");
    }
    Ok(deleted)
}

/// Count (check mode) or delete (clean mode) locks at least `max_age` old,
/// optionally restricted to `owner_ids`.
///
/// A zero age matches every lock. An invalid age matches nothing and the
/// store is not consulted.
pub async fn bulk_clean<S: LockStore>(
    store: &S,
    mode: CleanMode,
    max_age: MaxAge,
    owner_ids: &[DbId],
    now: Timestamp,
) -> Result<u64, CoreError> {
    let Some(filter) = bulk_filter(max_age, owner_ids, now) else {
        tracing::warn!(
            mode = %mode,
            "Content lock cleanup skipped: invalid age filter matches nothing"
        );
        return Ok(0);
    };

    let count = match mode {
        CleanMode::Check => store.count_matching(&filter).await,
        CleanMode::Clean => store.delete_matching(&filter).await,
    }
    .map_err(CoreError::store)?;

    tracing::info!(
        mode = %mode,
        count,
        owners = owner_ids.len(),
        "Content lock cleanup finished"
    );
    Ok(count)
}

/// Build the predicate for a bulk clean, or `None` when nothing can match.
fn bulk_filter(max_age: MaxAge, owner_ids: &[DbId], now: Timestamp) -> Option<LockFilter> {
    let age = match max_age {
        MaxAge::Invalid => return None,
        MaxAge::Seconds(0) => AgeBound::Any,
        MaxAge::Seconds(secs) if secs < 0 => return None,
        MaxAge::Seconds(secs) => AgeBound::AtOrBefore(cutoff(now, secs)?),
    };
    Some(LockFilter {
        age,
        owner_ids: owner_ids.to_vec(),
    })
}

fn cutoff(now: Timestamp, secs: i64) -> Option<Timestamp> {
    Duration::try_seconds(secs).and_then(|d| now.checked_sub_signed(d))
}
