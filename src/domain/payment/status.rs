//! Payment status state machine.
//!
//! Defines all possible payment states and valid transitions through the
//! capture/settlement/refund lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, no processor interaction has succeeded yet.
    Pending,

    /// Funds reserved on the instrument; not yet captured.
    Authorized,

    /// Funds captured; eligible for settlement or refund.
    Captured,

    /// Funds settled to the merchant account.
    Settled,

    /// Fully refunded. Terminal.
    Refunded,

    /// Partially refunded; further refunds may still apply.
    PartiallyRefunded,

    /// Cancelled before capture. Terminal.
    Voided,

    /// Processor reported a non-recoverable failure. Terminal.
    Failed,

    /// Processor declined the payment. Terminal.
    Declined,
}

impl PaymentStatus {
    /// True when a refund may be issued against this payment.
    ///
    /// A partially refunded payment stays refundable until the full amount
    /// has been returned.
    pub fn is_refundable(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Captured | PaymentStatus::Settled | PaymentStatus::PartiallyRefunded
        )
    }

    /// True when the payment may still be voided.
    pub fn is_voidable(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Authorized)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Authorized)
                | (Pending, Failed)
                | (Pending, Declined)
                | (Pending, Voided)
            // From AUTHORIZED
                | (Authorized, Captured)
                | (Authorized, Voided)
                | (Authorized, Failed)
            // From CAPTURED
                | (Captured, Settled)
                | (Captured, Refunded)
                | (Captured, PartiallyRefunded)
            // From SETTLED
                | (Settled, Refunded)
                | (Settled, PartiallyRefunded)
            // From PARTIALLY_REFUNDED
                | (PartiallyRefunded, Refunded)
                | (PartiallyRefunded, PartiallyRefunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Authorized, Failed, Declined, Voided],
            Authorized => vec![Captured, Voided, Failed],
            Captured => vec![Settled, Refunded, PartiallyRefunded],
            Settled => vec![Refunded, PartiallyRefunded],
            PartiallyRefunded => vec![Refunded, PartiallyRefunded],
            Refunded => vec![],
            Voided => vec![],
            Failed => vec![],
            Declined => vec![],
        }
    }
}
