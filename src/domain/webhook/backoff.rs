//! Exponential backoff schedule for webhook redelivery.

use std::time::Duration;

/// Backoff schedule: `delay(n) = min(base * 2^(n-1), max)` for the n-th
/// failed attempt.
///
/// With the defaults this yields 5, 10, 20, 40 minutes, capped at 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    /// Delay after the first failure.
    pub base_delay: Duration,

    /// Upper bound on any delay.
    pub max_delay: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5 * 60),
            max_delay: Duration::from_secs(60 * 60),
        }
    }
}

impl RetryBackoff {
    /// Creates a schedule with explicit bounds.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay before the next attempt, given how many attempts have failed.
    ///
    /// `attempt` is 1-based; `attempt = 0` is treated as 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = 1u64 << exponent;
        let delay = self
            .base_delay
            .checked_mul(multiplier as u32)
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: u64 = 60;

    #[test]
    fn default_schedule_doubles_from_five_minutes() {
        let backoff = RetryBackoff::default();

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(5 * MINUTE));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(10 * MINUTE));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(20 * MINUTE));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(40 * MINUTE));
    }

    #[test]
    fn default_schedule_caps_at_one_hour() {
        let backoff = RetryBackoff::default();

        assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(60 * MINUTE));
        assert_eq!(backoff.delay_for_attempt(12), Duration::from_secs(60 * MINUTE));
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let backoff = RetryBackoff::default();
        assert_eq!(backoff.delay_for_attempt(0), backoff.delay_for_attempt(1));
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let backoff = RetryBackoff::default();
        assert_eq!(backoff.delay_for_attempt(u32::MAX), backoff.max_delay);
    }

    #[test]
    fn custom_bounds_are_respected() {
        let backoff = RetryBackoff::new(Duration::from_secs(1), Duration::from_secs(6));

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(6));
    }
}
