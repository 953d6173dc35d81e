//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `resilience` - Circuit breaker and registry
//! - `processor` - Processor client implementations (mock)
//! - `http` - Outbound webhook delivery transport
//! - `postgres` - Persistent store implementations
//! - `memory` - In-memory stores for tests

pub mod http;
pub mod memory;
pub mod postgres;
pub mod processor;
pub mod resilience;

pub use http::ReqwestDeliveryTransport;
pub use memory::{InMemoryPaymentStore, InMemoryWebhookStore};
pub use postgres::{PostgresPaymentStore, PostgresWebhookStore};
pub use processor::MockProcessorClient;
pub use resilience::{CircuitBreakerRegistry, DependencyCircuitBreaker};
