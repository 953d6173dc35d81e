//! Webhook delivery status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Delivery status of an outbound webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    /// Created or claimed for dispatch; awaiting a delivery attempt.
    Pending,

    /// Subscriber acknowledged with a 2xx response. Terminal.
    Delivered,

    /// Subscriber permanently rejected the delivery. Terminal.
    Failed,

    /// Last attempt failed; scheduled for another attempt at
    /// `next_retry_at`.
    Retrying,

    /// Retry budget exhausted. Terminal.
    Expired,
}

impl WebhookStatus {
    /// True when a delivery attempt may be made in this status.
    pub fn is_deliverable(&self) -> bool {
        matches!(self, WebhookStatus::Pending | WebhookStatus::Retrying)
    }
}

impl StateMachine for WebhookStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use WebhookStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Delivered)
                | (Pending, Retrying)
                | (Pending, Expired)
                | (Pending, Failed)
            // From RETRYING (Pending = claimed by the scheduler)
                | (Retrying, Pending)
                | (Retrying, Delivered)
                | (Retrying, Retrying)
                | (Retrying, Expired)
                | (Retrying, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use WebhookStatus::*;
        match self {
            Pending => vec![Delivered, Retrying, Expired, Failed],
            Retrying => vec![Pending, Delivered, Retrying, Expired, Failed],
            Delivered => vec![],
            Failed => vec![],
            Expired => vec![],
        }
    }
}
