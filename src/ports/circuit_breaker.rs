//! CircuitBreaker port - Interface for external service resilience.
//!
//! The circuit breaker pattern prevents cascading failures when the
//! payment processor becomes unavailable or slow.
//!
//! ## States
//!
//! - **Closed**: Normal operation, requests flow through
//! - **Open**: Too many failures, requests rejected immediately
//! - **Half-Open**: Testing if service recovered, one trial request allowed
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[recovery_timeout elapsed]--> Half-Open
//! Half-Open --[trial succeeds]--> Closed
//! Half-Open --[trial fails]--> Open
//! ```

use std::time::Duration;

use crate::domain::foundation::Timestamp;

/// Circuit breaker states for external service protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests flow through to the service.
    Closed,

    /// Too many failures - requests rejected immediately without calling
    /// the service. The circuit transitions to HalfOpen after
    /// recovery_timeout.
    Open,

    /// Testing if service recovered - exactly one trial request allowed.
    /// Success → Closed, Failure → Open.
    HalfOpen,
}

impl CircuitState {
    /// Check if the circuit allows requests through.
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// Time to wait before testing recovery (moving to half-open).
    ///
    /// Default: 30 seconds
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Port for circuit breaker functionality.
///
/// Protects against cascading failures when the processor becomes
/// unavailable. Callers check `should_allow` before the call and feed the
/// outcome back with `record_success`/`record_failure`:
///
/// ```ignore
/// if !breaker.should_allow() {
///     return Err(DomainError::circuit_open("processor"));
/// }
/// match client.refund(txn, amount).await {
///     Ok(outcome) => {
///         breaker.record_success();
///         Ok(outcome)
///     }
///     Err(e) if e.is_transient() => {
///         breaker.record_failure();
///         Err(e.into())
///     }
///     Err(e) => {
///         // The dependency answered; a decline is not an outage.
///         breaker.record_success();
///         Err(e.into())
///     }
/// }
/// ```
pub trait CircuitBreaker: Send + Sync {
    /// Get the current state of the circuit.
    fn state(&self) -> CircuitState;

    /// Check if a request should be allowed through.
    ///
    /// Returns `true` if the circuit is closed, or half-open with the
    /// single trial slot free. When the circuit is open and the recovery
    /// timeout has elapsed, this transitions to half-open and grants the
    /// trial slot to the caller.
    fn should_allow(&self) -> bool;

    /// Record a successful request.
    ///
    /// In half-open state this closes the circuit; in closed state it
    /// resets the consecutive-failure count.
    fn record_success(&self);

    /// Record a failed request.
    ///
    /// In closed state this counts toward the failure threshold.
    /// In half-open state this immediately reopens the circuit and
    /// restarts the recovery clock.
    fn record_failure(&self);

    /// Force reset the circuit to closed state.
    ///
    /// Use sparingly - typically for administrative intervention.
    fn reset(&self);

    /// Get a read-only metrics snapshot.
    fn metrics(&self) -> CircuitBreakerMetrics;
}

/// Read-only snapshot of circuit breaker state for observability.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerMetrics {
    /// Current state
    pub state: Option<CircuitState>,

    /// Current consecutive failure count
    pub consecutive_failures: u32,

    /// When the most recent failure happened
    pub last_failure_at: Option<Timestamp>,

    /// Total successful requests since creation
    pub total_successes: u64,

    /// Total failed requests since creation
    pub total_failures: u64,

    /// Times the circuit has opened
    pub times_opened: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_state_allows_requests() {
        assert!(CircuitState::Closed.allows_requests());
        assert!(CircuitState::HalfOpen.allows_requests());
        assert!(!CircuitState::Open.allows_requests());
    }

    #[test]
    fn default_config_values() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.recovery_timeout, Duration::from_secs(30));
    }

    // Trait object safety test
    #[test]
    fn circuit_breaker_is_object_safe() {
        fn _accepts_dyn(_breaker: &dyn CircuitBreaker) {}
    }
}
