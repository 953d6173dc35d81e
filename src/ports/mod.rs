//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ProcessorClient` - External payment processor operations
//! - `PaymentStore` / `WebhookStore` - Persistence boundaries
//! - `CircuitBreaker` - External service resilience pattern
//! - `DeliveryTransport` - Outbound webhook HTTP delivery

mod circuit_breaker;
mod delivery_transport;
mod payment_store;
mod processor_client;
mod webhook_store;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState,
};
pub use delivery_transport::DeliveryTransport;
pub use payment_store::PaymentStore;
pub use processor_client::{
    ChargeRequest, ProcessorCharge, ProcessorClient, ProcessorError, ProcessorOutcome,
};
pub use webhook_store::{InsertOutcome, WebhookStore};
