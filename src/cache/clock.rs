//! Time sources for staleness checks
//!
//! The store asks a `Clock` for the current time instead of calling `Utc::now()`
//! directly, so tests can move time forward without sleeping.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Returns the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
///
/// Holds whole epoch seconds, which is the resolution the cache file records.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at the given epoch seconds
    pub fn at(epoch_seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(epoch_seconds),
        }
    }

    /// Moves the clock to the given epoch seconds
    pub fn set(&self, epoch_seconds: i64) {
        self.seconds.store(epoch_seconds, Ordering::SeqCst);
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let seconds = self.seconds.load(Ordering::SeqCst);
        Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_where_told() {
        let clock = ManualClock::at(1_000);
        assert_eq!(clock.now().timestamp(), 1_000);
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::at(1_000);
        clock.advance(Duration::seconds(86_400));
        assert_eq!(clock.now().timestamp(), 87_400);

        clock.set(5);
        assert_eq!(clock.now().timestamp(), 5);
    }

    #[test]
    fn test_system_clock_is_close_to_now() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();
        assert!(now >= before && now <= after);
    }
}
