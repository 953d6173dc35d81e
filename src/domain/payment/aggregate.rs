//! Payment aggregate entity.
//!
//! The Payment aggregate tracks a single transaction through its lifecycle
//! and owns the refund/void accounting.
//!
//! # Design Decisions
//!
//! - **Fixed-point money**: amounts are `Money` (decimal at minor-unit
//!   precision), never floats
//! - **Centralized transitions**: every status change goes through the
//!   `PaymentStatus` state machine
//! - **Processor is the side-effecting step**: aggregate mutations are only
//!   applied after the processor call succeeded; a failed call leaves the
//!   record untouched
//! - **Never deleted**: terminal payments are retained for audit

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, ExternalId, Money, PaymentId, StateMachine, Timestamp,
};

use super::{PaymentMethod, PaymentStatus};

/// Payment aggregate - one transaction moving through the gateway.
///
/// # Invariants
///
/// - `refunded_amount` is monotonically non-decreasing and never exceeds
///   `amount`
/// - `refund_count` equals the number of refunds ever applied
/// - `version` increments on every persisted mutation (optimistic locking)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// Caller-facing identifier, unique, immutable after creation.
    pub external_id: ExternalId,

    /// Charged amount.
    pub amount: Money,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Instrument used to fund the payment.
    pub payment_method: PaymentMethod,

    /// Processor-side transaction id, set once the processor accepts.
    pub processor_transaction_id: Option<String>,

    /// Total refunded so far.
    pub refunded_amount: Money,

    /// Number of refunds applied.
    pub refund_count: u32,

    /// Customer email, if supplied.
    pub customer_email: Option<String>,

    /// Opaque caller-controlled metadata; never interpreted by the engine.
    pub metadata: HashMap<String, String>,

    /// When the payment was created.
    pub created_at: Timestamp,

    /// When the payment was last updated.
    pub updated_at: Timestamp,

    /// When the processor first accepted the payment.
    pub processed_at: Option<Timestamp>,

    /// When the payment settled.
    pub settled_at: Option<Timestamp>,

    /// Optimistic-concurrency version of the persisted row.
    pub version: i64,
}

impl Payment {
    /// Creates a new payment in `Pending`.
    pub fn create(
        id: PaymentId,
        external_id: ExternalId,
        amount: Money,
        payment_method: PaymentMethod,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            external_id,
            amount,
            status: PaymentStatus::Pending,
            payment_method,
            processor_transaction_id: None,
            refunded_amount: Money::zero(amount.currency()),
            refund_count: 0,
            customer_email,
            metadata,
            created_at: now,
            updated_at: now,
            processed_at: None,
            settled_at: None,
            version: 0,
        }
    }

    /// Amount still available for refund.
    pub fn remaining_refund_amount(&self) -> Money {
        self.amount - self.refunded_amount
    }

    /// True when a refund may be issued.
    pub fn is_refundable(&self) -> bool {
        self.status.is_refundable()
    }

    /// True when the payment may be voided.
    pub fn is_voidable(&self) -> bool {
        self.status.is_voidable()
    }

    /// Records a successful authorization.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Pending`.
    pub fn authorize(&mut self, processor_transaction_id: String) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Authorized)?;
        self.processor_transaction_id = Some(processor_transaction_id);
        self.processed_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Records a successful capture of previously authorized funds.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Authorized`.
    pub fn capture(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Captured)?;
        self.processed_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Records a successful direct charge (authorize and capture in one
    /// processor call).
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Pending`.
    pub fn charge(&mut self, processor_transaction_id: String) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Authorized)?;
        self.transition_to(PaymentStatus::Captured)?;
        self.processor_transaction_id = Some(processor_transaction_id);
        self.processed_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Records settlement of captured funds.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Captured`.
    pub fn settle(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Settled)?;
        self.settled_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Applies a successful refund to the accounting.
    ///
    /// Moves to `Refunded` when the full amount has been returned,
    /// `PartiallyRefunded` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if the payment is not refundable, the
    /// amount is not positive, the currency differs, or the amount exceeds
    /// what remains refundable. The record is unchanged on error.
    pub fn apply_refund(&mut self, amount: Money) -> Result<(), DomainError> {
        if !self.is_refundable() {
            return Err(DomainError::validation(
                "status",
                format!("Payment in status {:?} is not refundable", self.status),
            ));
        }
        if !amount.same_currency(&self.amount) {
            return Err(DomainError::validation(
                "currency",
                format!(
                    "Refund currency {} does not match payment currency {}",
                    amount.currency(),
                    self.amount.currency()
                ),
            ));
        }
        if !amount.is_positive() {
            return Err(DomainError::validation(
                "amount",
                "Refund amount must be positive",
            ));
        }
        let remaining = self.remaining_refund_amount();
        if amount > remaining {
            return Err(DomainError::validation(
                "amount",
                format!(
                    "Refund amount {} exceeds remaining refundable amount {}",
                    amount, remaining
                ),
            ));
        }

        let new_refunded = self.refunded_amount + amount;
        let target = if new_refunded == self.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.transition_to(target)?;
        self.refunded_amount = new_refunded;
        self.refund_count += 1;
        self.touch();
        Ok(())
    }

    /// Voids the payment.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` unless the payment is `Pending` or
    /// `Authorized`.
    pub fn void(&mut self) -> Result<(), DomainError> {
        if !self.is_voidable() {
            return Err(DomainError::validation(
                "status",
                format!("Payment in status {:?} cannot be voided", self.status),
            ));
        }
        self.transition_to(PaymentStatus::Voided)?;
        self.touch();
        Ok(())
    }

    /// Marks the payment failed after a non-recoverable processor error.
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.touch();
        Ok(())
    }

    /// Marks the payment declined by the processor.
    pub fn mark_declined(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Declined)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition payment from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
