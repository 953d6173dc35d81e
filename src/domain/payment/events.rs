//! Payment lifecycle event types.
//!
//! Each successful ledger mutation emits one of these events, which the
//! delivery engine turns into a signed webhook.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::foundation::{EventId, Timestamp, ValidationError};

use super::Payment;

/// Kinds of payment lifecycle events published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    Created,
    Authorized,
    Captured,
    Settled,
    Refunded,
    Voided,
    Failed,
}

impl PaymentEventType {
    /// Wire name of the event type (`payment.captured` etc.).
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventType::Created => "payment.created",
            PaymentEventType::Authorized => "payment.authorized",
            PaymentEventType::Captured => "payment.captured",
            PaymentEventType::Settled => "payment.settled",
            PaymentEventType::Refunded => "payment.refunded",
            PaymentEventType::Voided => "payment.voided",
            PaymentEventType::Failed => "payment.failed",
        }
    }

    /// Parse a wire name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFormat` for names outside the known
    /// set.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "payment.created" => Ok(PaymentEventType::Created),
            "payment.authorized" => Ok(PaymentEventType::Authorized),
            "payment.captured" => Ok(PaymentEventType::Captured),
            "payment.settled" => Ok(PaymentEventType::Settled),
            "payment.refunded" => Ok(PaymentEventType::Refunded),
            "payment.voided" => Ok(PaymentEventType::Voided),
            "payment.failed" => Ok(PaymentEventType::Failed),
            other => Err(ValidationError::invalid_format(
                "event_type",
                format!("Unknown event type: {}", other),
            )),
        }
    }
}

impl std::fmt::Display for PaymentEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment lifecycle event ready for webhook publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Unique event id used by receivers for de-duplication.
    pub event_id: EventId,

    /// Kind of lifecycle change.
    pub event_type: PaymentEventType,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Event body published to the subscriber.
    pub data: serde_json::Value,
}

impl PaymentEvent {
    /// Builds an event describing the payment's current state.
    pub fn for_payment(event_type: PaymentEventType, payment: &Payment) -> Self {
        Self {
            event_id: EventId::generate(),
            event_type,
            occurred_at: Timestamp::now(),
            data: json!({
                "paymentId": payment.id.to_string(),
                "externalId": payment.external_id.as_str(),
                "amount": payment.amount.amount(),
                "currency": payment.amount.currency().code(),
                "status": payment.status,
                "refundedAmount": payment.refunded_amount.amount(),
                "refundCount": payment.refund_count,
                "processorTransactionId": payment.processor_transaction_id,
            }),
        }
    }

    /// Serializes the event into the outbound webhook payload shape.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "eventType": self.event_type.as_str(),
            "eventId": self.event_id.as_str(),
            "data": self.data,
            "createdAt": self.occurred_at,
        })
    }
}
