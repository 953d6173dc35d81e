//! Injectable clock for time-dependent components.
//!
//! The circuit breaker and webhook signer both make decisions based on
//! "now". Injecting the clock keeps those decisions deterministic in tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current moment.
    fn now(&self) -> Timestamp;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually-advanced clock for tests.
///
/// Stores Unix seconds in an atomic so shared references can advance time
/// without interior locking.
#[derive(Debug, Default)]
pub struct ManualClock {
    unix_secs: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given Unix seconds.
    pub fn starting_at(unix_secs: i64) -> Arc<Self> {
        Arc::new(Self {
            unix_secs: AtomicI64::new(unix_secs),
        })
    }

    /// Advances the clock by the given number of seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.unix_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute Unix second.
    pub fn set(&self, unix_secs: i64) {
        self.unix_secs.store(unix_secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_secs(self.unix_secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_wall_time() {
        let clock = SystemClock;
        let before = Timestamp::now();
        let now = clock.now();
        assert!(now >= before);
    }

    #[test]
    fn manual_clock_starts_at_given_time() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.now().as_unix_secs(), 1_000);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(1_000);
        clock.advance_secs(30);
        assert_eq!(clock.now().as_unix_secs(), 1_030);
    }

    #[test]
    fn manual_clock_set_overrides() {
        let clock = ManualClock::starting_at(1_000);
        clock.set(5_000);
        assert_eq!(clock.now().as_unix_secs(), 5_000);
    }
}
