//! PostgreSQL adapters - persistent implementations of the store ports.

mod payment_store;
mod webhook_store;

pub use payment_store::PostgresPaymentStore;
pub use webhook_store::PostgresWebhookStore;
