use crate::error::{LifecycleError, Result};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span, Timestamp};

/// Computes when a record deleted at `deleted_at` becomes purgeable:
/// 23:59:59.999 UTC on the calendar day `retention_days` after deletion.
pub fn purge_deadline(deleted_at: Timestamp, retention_days: u32) -> Result<Timestamp> {
    let day = deleted_at
        .to_zoned(TimeZone::UTC)
        .date()
        .checked_add(Span::new().days(i64::from(retention_days)))
        .map_err(|e| LifecycleError::Schedule(e.to_string()))?;

    day.at(23, 59, 59, 999_000_000)
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| LifecycleError::Schedule(e.to_string()))
}

/// Records last accessed before this instant are stale.
pub fn stale_cutoff(now: Timestamp, retention: SignedDuration) -> Timestamp {
    now - retention
}
