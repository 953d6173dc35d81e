//! Clock-driven circuit breaker implementation.
//!
//! State lives behind a single mutex per dependency: the structure is
//! low-cardinality and high-contention, so one lock is the right tool.
//! Time is injected through `Clock` so recovery behavior is deterministic
//! in tests.

use std::sync::{Arc, Mutex};

use crate::domain::foundation::{Clock, Timestamp};
use crate::ports::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};

/// Mutable breaker state, guarded by one mutex.
#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Timestamp>,
    /// Whether the single half-open trial slot has been handed out.
    probe_granted: bool,
    total_successes: u64,
    total_failures: u64,
    times_opened: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            probe_granted: false,
            total_successes: 0,
            total_failures: 0,
            times_opened: 0,
        }
    }
}

/// Circuit breaker for a single named dependency.
pub struct DependencyCircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
}

impl DependencyCircuitBreaker {
    /// Creates a closed breaker for the named dependency.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    /// Name of the protected dependency.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn recovery_elapsed(&self, state: &BreakerState) -> bool {
        match state.last_failure_at {
            Some(last) => {
                let elapsed = self.clock.now().duration_since(&last);
                elapsed.num_seconds() >= self.config.recovery_timeout.as_secs() as i64
            }
            None => true,
        }
    }
}

impl CircuitBreaker for DependencyCircuitBreaker {
    fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    fn should_allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.recovery_elapsed(&inner) {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_granted = true;
                    tracing::info!(
                        dependency = %self.name,
                        "Circuit breaker half-open, allowing trial request"
                    );
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_granted {
                    false
                } else {
                    inner.probe_granted = true;
                    true
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.total_successes += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                tracing::info!(dependency = %self.name, "Circuit breaker closed after successful trial");
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.probe_granted = false;
            }
            CircuitState::Open => {
                // Late completion of a call that started before the circuit
                // opened; the open state stands until the timeout expires.
            }
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.total_failures += 1;
        inner.last_failure_at = Some(self.clock.now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.times_opened += 1;
                    tracing::warn!(
                        dependency = %self.name,
                        consecutive_failures = inner.consecutive_failures,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.times_opened += 1;
                inner.probe_granted = false;
                tracing::warn!(dependency = %self.name, "Circuit breaker reopened after failed trial");
            }
            CircuitState::Open => {
                // Already open; the fresh last_failure_at restarts the clock.
            }
        }
    }

    fn reset(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
        inner.probe_granted = false;
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock().expect("breaker lock poisoned");
        CircuitBreakerMetrics {
            state: Some(inner.state),
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            times_opened: inner.times_opened,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ManualClock;
    use std::time::Duration;

    fn test_breaker(threshold: u32, timeout_secs: u64) -> (DependencyCircuitBreaker, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(1_000);
        let config = CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: Duration::from_secs(timeout_secs),
        };
        let breaker = DependencyCircuitBreaker::new("processor", config, clock.clone());
        (breaker, clock)
    }

    #[test]
    fn starts_closed_and_allows_requests() {
        let (breaker, _clock) = test_breaker(3, 30);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.should_allow());
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let (breaker, _clock) = test_breaker(3, 30);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let (breaker, _clock) = test_breaker(3, 30);

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().consecutive_failures, 2);
    }

    #[test]
    fn half_open_after_recovery_timeout() {
        let (breaker, clock) = test_breaker(1, 30);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_allow());

        clock.advance_secs(29);
        assert!(!breaker.should_allow());

        clock.advance_secs(1);
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_allows_exactly_one_trial() {
        let (breaker, clock) = test_breaker(1, 30);
        breaker.record_failure();
        clock.advance_secs(30);

        assert!(breaker.should_allow());
        assert!(!breaker.should_allow(), "second caller must not get a trial slot");
        assert!(!breaker.should_allow());
    }

    #[test]
    fn successful_trial_closes_circuit() {
        let (breaker, clock) = test_breaker(1, 30);
        breaker.record_failure();
        clock.advance_secs(30);
        assert!(breaker.should_allow());

        breaker.record_success();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().consecutive_failures, 0);
        assert!(breaker.should_allow());
    }

    #[test]
    fn failed_trial_reopens_and_restarts_the_clock() {
        let (breaker, clock) = test_breaker(1, 30);
        breaker.record_failure();
        clock.advance_secs(30);
        assert!(breaker.should_allow());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        // The timeout restarts from the trial failure, not the original one.
        clock.advance_secs(29);
        assert!(!breaker.should_allow());
        clock.advance_secs(1);
        assert!(breaker.should_allow());
    }

    #[test]
    fn reset_returns_to_closed() {
        let (breaker, _clock) = test_breaker(1, 30);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.should_allow());
    }

    #[test]
    fn metrics_snapshot_tracks_counters() {
        let (breaker, _clock) = test_breaker(2, 30);

        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();

        let metrics = breaker.metrics();
        assert_eq!(metrics.state, Some(CircuitState::Open));
        assert_eq!(metrics.total_successes, 1);
        assert_eq!(metrics.total_failures, 2);
        assert_eq!(metrics.times_opened, 1);
        assert!(metrics.last_failure_at.is_some());
    }

    #[test]
    fn success_while_open_does_not_close_circuit() {
        let (breaker, _clock) = test_breaker(1, 30);
        breaker.record_failure();

        breaker.record_success();

        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
