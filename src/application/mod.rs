//! Application layer - services orchestrating domain, ports, and adapters.
//!
//! - `ledger` - PaymentLedger lifecycle operations
//! - `delivery` - WebhookDeliveryEngine signing and dispatch
//! - `scheduler` - RetryScheduler background sweeps

mod delivery;
mod ledger;
mod scheduler;

pub use delivery::{DeliveryConfig, WebhookDeliveryEngine};
pub use ledger::{CreatePaymentRequest, LedgerConfig, PaymentLedger};
pub use scheduler::{RetryScheduler, RetrySchedulerConfig};
