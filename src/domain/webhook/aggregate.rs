//! Webhook delivery aggregate entity.
//!
//! One record per event notification owed to a subscriber. The delivery
//! engine owns every mutation; the payment ledger only creates events and
//! never touches these records afterwards.
//!
//! # Invariants
//!
//! - `retry_count <= max_retries`
//! - `next_retry_at` is non-null iff `status == Retrying`
//! - once `Delivered`, `Expired`, or `Failed`, the record is immutable

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, PaymentId, StateMachine, Timestamp, WebhookId,
};
use crate::domain::payment::PaymentEventType;

use super::{RetryBackoff, WebhookStatus};

/// HTTP status the subscriber uses to signal a permanently dead endpoint.
const GONE: u16 = 410;

/// Outcome of a single delivery attempt, as classified by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Subscriber responded; any status code.
    Responded { status_code: u16, body: String },

    /// Request timed out.
    TimedOut,

    /// Connection could not be established.
    ConnectionFailed(String),
}

impl AttemptOutcome {
    /// True for 2xx responses.
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Responded { status_code, .. } if (200..300).contains(status_code))
    }

    /// True when the subscriber signalled the endpoint is gone for good.
    pub fn is_permanent_rejection(&self) -> bool {
        matches!(self, AttemptOutcome::Responded { status_code, .. } if *status_code == GONE)
    }
}

/// Webhook delivery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// Unique identifier for this delivery record.
    pub id: WebhookId,

    /// Event id, unique across all webhooks; receivers de-duplicate on it.
    pub event_id: EventId,

    /// Kind of lifecycle event being announced.
    pub event_type: PaymentEventType,

    /// Payment the event describes. Weak reference; the delivery engine
    /// never mutates the payment.
    pub payment_id: Option<PaymentId>,

    /// Subscriber endpoint.
    pub url: String,

    /// Outbound headers, including the signature.
    pub headers: HashMap<String, String>,

    /// JSON event payload.
    pub payload: serde_json::Value,

    /// Delivery status.
    pub status: WebhookStatus,

    /// Failed attempts so far.
    pub retry_count: u32,

    /// Retry budget.
    pub max_retries: u32,

    /// When the next attempt is due; set only while `Retrying`.
    pub next_retry_at: Option<Timestamp>,

    /// HTTP status of the last attempt, if the subscriber responded.
    pub response_status_code: Option<u16>,

    /// Response body of the last attempt.
    pub response_body: Option<String>,

    /// Set for inbound webhooks after signature verification.
    pub signature_verified: Option<bool>,

    /// When the delivery succeeded.
    pub delivered_at: Option<Timestamp>,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last updated.
    pub updated_at: Timestamp,
}

impl WebhookDelivery {
    /// Creates a new outbound delivery record in `Pending`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: WebhookId,
        event_id: EventId,
        event_type: PaymentEventType,
        payment_id: Option<PaymentId>,
        url: String,
        headers: HashMap<String, String>,
        payload: serde_json::Value,
        max_retries: u32,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            event_id,
            event_type,
            payment_id,
            url,
            headers,
            payload,
            status: WebhookStatus::Pending,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            response_status_code: None,
            response_body: None,
            signature_verified: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when a delivery attempt may be made.
    pub fn is_deliverable(&self) -> bool {
        self.status.is_deliverable()
    }

    /// True when the record is due for redelivery at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == WebhookStatus::Retrying
            && self.next_retry_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Records a successful delivery.
    ///
    /// # Errors
    ///
    /// Returns `WebhookNotDeliverable` if the record is not in a
    /// deliverable status.
    pub fn mark_delivered(&mut self, status_code: u16, body: String) -> Result<(), DomainError> {
        self.ensure_deliverable()?;
        self.transition_to(WebhookStatus::Delivered)?;
        self.response_status_code = Some(status_code);
        self.response_body = Some(body);
        self.next_retry_at = None;
        self.delivered_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Records a failed attempt, scheduling a retry or expiring the record.
    ///
    /// Schedules the next attempt at `now + backoff(retry_count)` while the
    /// retry budget lasts; once `retry_count` has reached `max_retries` the
    /// record expires. A permanent rejection (HTTP 410) fails the record
    /// immediately without consuming the budget.
    ///
    /// # Errors
    ///
    /// Returns `WebhookNotDeliverable` if the record is not in a
    /// deliverable status.
    pub fn record_failure(
        &mut self,
        outcome: &AttemptOutcome,
        backoff: &RetryBackoff,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_deliverable()?;

        if let AttemptOutcome::Responded { status_code, body } = outcome {
            self.response_status_code = Some(*status_code);
            self.response_body = Some(body.clone());
        }

        if outcome.is_permanent_rejection() {
            self.transition_to(WebhookStatus::Failed)?;
            self.next_retry_at = None;
            self.touch();
            return Ok(());
        }

        if self.retry_count < self.max_retries {
            self.retry_count += 1;
            self.transition_to(WebhookStatus::Retrying)?;
            self.next_retry_at = Some(now.plus(backoff.delay_for_attempt(self.retry_count)));
        } else {
            self.transition_to(WebhookStatus::Expired)?;
            self.next_retry_at = None;
        }
        self.touch();
        Ok(())
    }

    /// Claims a due record for dispatch, moving it back to `Pending`.
    ///
    /// Clearing `next_retry_at` here is what prevents a second sweep from
    /// selecting the same record while a slow HTTP call is in flight.
    ///
    /// # Errors
    ///
    /// Returns `WebhookNotDeliverable` unless the record is `Retrying` and
    /// due at `now`.
    pub fn claim(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if !self.is_due(now) {
            return Err(DomainError::new(
                ErrorCode::WebhookNotDeliverable,
                format!(
                    "Webhook {} is not due for redelivery (status {:?})",
                    self.id, self.status
                ),
            ));
        }
        self.transition_to(WebhookStatus::Pending)?;
        self.next_retry_at = None;
        self.touch();
        Ok(())
    }

    /// Records the outcome of inbound signature verification.
    pub fn record_signature_verification(&mut self, verified: bool) {
        self.signature_verified = Some(verified);
        self.touch();
    }

    fn ensure_deliverable(&self) -> Result<(), DomainError> {
        if !self.is_deliverable() {
            return Err(DomainError::new(
                ErrorCode::WebhookNotDeliverable,
                format!(
                    "Webhook {} in status {:?} cannot be delivered",
                    self.id, self.status
                ),
            ));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    fn transition_to(&mut self, target: WebhookStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition webhook from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
