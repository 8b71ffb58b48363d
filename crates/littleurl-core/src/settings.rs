use crate::error::{CoreError, Result};
use jiff::SignedDuration;
use typed_builder::TypedBuilder;

/// Retention window used when the configured value is missing or unparseable.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Upper bound on the retention window (roughly a century).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// How a freshly generated key is written to the active partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Idempotent upsert. A colliding key silently replaces the existing
    /// record; the 3-character keyspace makes this improbable, not impossible.
    Overwrite,
    /// Exclusive insert, regenerating the key on collision up to
    /// `max_attempts` times.
    Retry { max_attempts: u32 },
}

/// Where opportunistic sweeps run once a lookup decides they are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDispatch {
    /// Spawned onto the tokio runtime; the lookup does not wait.
    Background,
    /// Awaited inside the lookup before it returns.
    Inline,
}

/// Tunables for the lifecycle engine.
#[derive(Debug, Clone, TypedBuilder)]
pub struct LifecycleSettings {
    /// Days a record may go unread before it is soft-deleted, and days a
    /// soft-deleted record is kept before it is purged.
    #[builder(default = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u32,
    /// Minimum time between two runs of the same opportunistic sweep.
    #[builder(default = SignedDuration::from_hours(24))]
    pub sweep_interval: SignedDuration,
    #[builder(default = CollisionPolicy::Overwrite)]
    pub collision_policy: CollisionPolicy,
    #[builder(default = SweepDispatch::Background)]
    pub sweep_dispatch: SweepDispatch,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LifecycleSettings {
    /// Parses a raw retention setting, falling back to
    /// [`DEFAULT_RETENTION_DAYS`] when it is unset, unparseable or out of range.
    pub fn retention_days_or_default(raw: Option<&str>) -> u32 {
        raw.and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|days| (1..=MAX_RETENTION_DAYS).contains(days))
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    /// The retention window as a duration.
    pub fn retention(&self) -> SignedDuration {
        SignedDuration::from_hours(24 * i64::from(self.retention_days))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            return Err(CoreError::InvalidSettings(format!(
                "retention_days must be between 1 and {}, got {}",
                MAX_RETENTION_DAYS, self.retention_days
            )));
        }
        if self.sweep_interval.is_negative() {
            return Err(CoreError::InvalidSettings(
                "sweep_interval must not be negative".to_string(),
            ));
        }
        if let CollisionPolicy::Retry { max_attempts: 0 } = self.collision_policy {
            return Err(CoreError::InvalidSettings(
                "collision retry needs at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}
