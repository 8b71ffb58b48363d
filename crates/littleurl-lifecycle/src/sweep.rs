use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use std::fmt::Display;

/// The two opportunistic maintenance passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    /// Soft-deletes active records that went unread for the retention window.
    Retention,
    /// Permanently removes deleted records past their purge deadline.
    Purge,
}

impl Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retention => f.write_str("retention"),
            Self::Purge => f.write_str("purge"),
        }
    }
}

/// Decides whether an opportunistic sweep is due.
///
/// A sweep is due when it never ran or its last run is more than `interval`
/// ago. Claiming a run stamps the gate immediately, so concurrent lookups
/// racing on the same instant start at most one run between them. Gates are
/// per engine instance; separate processes each keep their own.
#[derive(Debug)]
pub struct SweepGate {
    interval: SignedDuration,
    last_run: Mutex<Option<Timestamp>>,
}

impl SweepGate {
    pub fn new(interval: SignedDuration) -> Self {
        Self {
            interval,
            last_run: Mutex::new(None),
        }
    }

    /// Claims a run at `now` if one is due. Returns `true` when the caller
    /// should run the sweep.
    pub fn try_begin(&self, now: Timestamp) -> bool {
        let mut last_run = self.last_run.lock();
        let due = match *last_run {
            None => true,
            Some(previous) => previous + self.interval < now,
        };
        if due {
            *last_run = Some(now);
        }
        due
    }

    pub fn last_run(&self) -> Option<Timestamp> {
        *self.last_run.lock()
    }
}

/// Tally of a single sweep or reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records the scan yielded.
    pub examined: usize,
    /// Records moved, purged or repaired.
    pub affected: usize,
    /// Per-record operations that failed and were skipped.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_is_always_due() {
        let gate = SweepGate::new(SignedDuration::from_hours(24));
        let now = Timestamp::from_second(1_000).unwrap();
        assert!(gate.try_begin(now));
        assert_eq!(gate.last_run(), Some(now));
    }

    #[test]
    fn not_due_within_interval() {
        let gate = SweepGate::new(SignedDuration::from_hours(24));
        let start = Timestamp::from_second(1_000).unwrap();
        assert!(gate.try_begin(start));

        assert!(!gate.try_begin(start + SignedDuration::from_hours(23)));
        // Exactly one interval later is not "more than" one interval.
        assert!(!gate.try_begin(start + SignedDuration::from_hours(24)));
        assert!(gate.try_begin(start + SignedDuration::from_hours(24) + SignedDuration::from_secs(1)));
    }

    #[test]
    fn failed_claim_keeps_previous_stamp() {
        let gate = SweepGate::new(SignedDuration::from_hours(24));
        let start = Timestamp::from_second(1_000).unwrap();
        gate.try_begin(start);
        gate.try_begin(start + SignedDuration::from_hours(1));
        assert_eq!(gate.last_run(), Some(start));
    }
}
