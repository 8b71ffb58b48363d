use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of the current time for the lifecycle engine.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the engine and keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Moves the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: SignedDuration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_works() {
        let base = Timestamp::from_second(0).unwrap();
        let clock = ManualClock::new(base);
        assert_eq!(clock.now(), base);

        clock.advance(SignedDuration::from_hours(2));
        assert_eq!(clock.now(), Timestamp::from_second(7200).unwrap());

        let target = Timestamp::from_second(1000).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new(Timestamp::from_second(0).unwrap());
        let handle = clock.clone();
        handle.advance(SignedDuration::from_secs(5));
        assert_eq!(clock.now(), Timestamp::from_second(5).unwrap());
    }
}
