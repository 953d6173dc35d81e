//! Circuit breaker registry.
//!
//! One breaker per logical dependency name, shared by every caller in the
//! process. The registry is passed by reference into the ledger and the
//! delivery engine rather than living in a global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::{Clock, SystemClock};
use crate::ports::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics};

use super::DependencyCircuitBreaker;

/// Registry of per-dependency circuit breakers.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: Mutex<HashMap<String, Arc<DependencyCircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Creates a registry using the system clock.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a registry with an injected clock (deterministic tests).
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the breaker for a dependency, creating it on first use.
    pub fn breaker(&self, dependency: &str) -> Arc<dyn CircuitBreaker> {
        let mut breakers = self.breakers.lock().expect("registry lock poisoned");
        breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                Arc::new(DependencyCircuitBreaker::new(
                    dependency,
                    self.config.clone(),
                    self.clock.clone(),
                ))
            })
            .clone()
    }

    /// Metrics snapshot for every registered dependency.
    pub fn metrics(&self) -> HashMap<String, CircuitBreakerMetrics> {
        let breakers = self.breakers.lock().expect("registry lock poisoned");
        breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.metrics()))
            .collect()
    }
}
