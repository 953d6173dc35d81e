//! Foundation value objects and shared domain infrastructure.
//!
//! - `errors` - DomainError, ErrorCode, ValidationError
//! - `ids` - Strongly-typed identifiers
//! - `timestamp` - UTC point-in-time value object
//! - `clock` - Injectable time source
//! - `money` - Fixed-point amounts and ISO-4217 currencies
//! - `state_machine` - Transition-table trait for status enums

mod clock;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, ExternalId, PaymentId, WebhookId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
