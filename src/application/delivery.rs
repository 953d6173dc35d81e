//! WebhookDeliveryEngine - signs, dispatches, and retries event deliveries.
//!
//! The engine owns every `WebhookDelivery` mutation: creation, attempt
//! classification, retry scheduling, and expiry. The payment ledger only
//! hands it events; the retry scheduler only re-dispatches what the store
//! says is due.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{Clock, DomainError, ErrorCode, PaymentId, SystemClock, WebhookId};
use crate::domain::payment::PaymentEvent;
use crate::domain::webhook::{
    AttemptOutcome, RetryBackoff, SignatureHeader, WebhookDelivery, WebhookSigner,
};
use crate::ports::{DeliveryTransport, InsertOutcome, WebhookStore};

/// Configuration for webhook delivery behavior.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Retry budget per webhook.
    ///
    /// Default: 3 retries
    pub max_retries: u32,

    /// Redelivery backoff schedule.
    pub backoff: RetryBackoff,

    /// Maximum accepted age of inbound webhook signatures.
    ///
    /// Default: 5 minutes
    pub signature_max_age: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: RetryBackoff::default(),
            signature_max_age: Duration::from_secs(300),
        }
    }
}

/// Signs and delivers payment lifecycle events to subscriber endpoints.
pub struct WebhookDeliveryEngine {
    store: Arc<dyn WebhookStore>,
    transport: Arc<dyn DeliveryTransport>,
    signer: WebhookSigner,
    config: DeliveryConfig,
    clock: Arc<dyn Clock>,
}

impl WebhookDeliveryEngine {
    /// Creates an engine with the system clock.
    pub fn new(
        store: Arc<dyn WebhookStore>,
        transport: Arc<dyn DeliveryTransport>,
        signer: WebhookSigner,
        config: DeliveryConfig,
    ) -> Self {
        Self::with_clock(store, transport, signer, config, Arc::new(SystemClock))
    }

    /// Creates an engine with an injected clock (deterministic tests).
    pub fn with_clock(
        store: Arc<dyn WebhookStore>,
        transport: Arc<dyn DeliveryTransport>,
        signer: WebhookSigner,
        config: DeliveryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            transport,
            signer,
            config,
            clock,
        }
    }

    /// Creates a signed, pending delivery record for an event.
    ///
    /// Creation is idempotent on the event id: if a record for this event
    /// already exists, the existing record is returned and no duplicate
    /// deliverable is produced.
    pub async fn create_event(
        &self,
        event: PaymentEvent,
        payment_id: Option<PaymentId>,
        url: &str,
    ) -> Result<WebhookDelivery, DomainError> {
        let payload = event.to_payload();
        let body = payload.to_string();

        let signature = self.signer.sign(body.as_bytes());
        let timestamp = SignatureHeader::parse(&signature)
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::InternalError,
                    format!("Generated signature header failed to parse: {}", e),
                )
            })?
            .timestamp;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("X-Webhook-Signature".to_string(), signature);
        headers.insert(
            "X-Webhook-Event".to_string(),
            event.event_type.as_str().to_string(),
        );
        headers.insert(
            "X-Webhook-Event-ID".to_string(),
            event.event_id.as_str().to_string(),
        );
        headers.insert("X-Webhook-Timestamp".to_string(), timestamp.to_string());

        let webhook = WebhookDelivery::create(
            WebhookId::new(),
            event.event_id.clone(),
            event.event_type,
            payment_id,
            url.to_string(),
            headers,
            payload,
            self.config.max_retries,
        );

        match self.store.insert(&webhook).await? {
            InsertOutcome::Inserted => {
                tracing::debug!(
                    webhook_id = %webhook.id,
                    event_id = %webhook.event_id,
                    event_type = %webhook.event_type,
                    "Webhook event created"
                );
                Ok(webhook)
            }
            InsertOutcome::AlreadyExists => {
                tracing::debug!(
                    event_id = %event.event_id,
                    "Webhook event already exists, reusing record"
                );
                self.store
                    .find_by_event_id(&event.event_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::WebhookNotFound,
                            "Duplicate event vanished between insert and lookup",
                        )
                    })
            }
        }
    }

    /// Attempts delivery of a webhook and records the classified outcome.
    ///
    /// - 2xx response: `Delivered`
    /// - HTTP 410: `Failed` (permanent)
    /// - anything else (other status, timeout, connect error): `Retrying`
    ///   while the budget lasts, then `Expired`
    ///
    /// Returns the updated record. A failed attempt is not an `Err`; it is
    /// classified state on the record. Errors are reserved for webhooks in
    /// a non-deliverable status and storage failures.
    pub async fn deliver(&self, webhook_id: &WebhookId) -> Result<WebhookDelivery, DomainError> {
        let mut webhook = self
            .store
            .find_by_id(webhook_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::WebhookNotFound, "Webhook not found"))?;

        if !webhook.is_deliverable() {
            return Err(DomainError::new(
                ErrorCode::WebhookNotDeliverable,
                format!(
                    "Webhook {} in status {:?} cannot be delivered",
                    webhook.id, webhook.status
                ),
            ));
        }

        let body = webhook.payload.to_string();
        let outcome = self
            .transport
            .post(&webhook.url, &webhook.headers, &body)
            .await;

        if outcome.is_success() {
            if let AttemptOutcome::Responded { status_code, body } = outcome {
                webhook.mark_delivered(status_code, body)?;
            }
            tracing::info!(
                webhook_id = %webhook.id,
                event_type = %webhook.event_type,
                "Webhook delivered"
            );
        } else {
            webhook.record_failure(&outcome, &self.config.backoff, self.clock.now())?;
            tracing::warn!(
                webhook_id = %webhook.id,
                event_type = %webhook.event_type,
                status = ?webhook.status,
                retry_count = webhook.retry_count,
                "Webhook delivery attempt failed"
            );
        }

        self.store.update(&webhook).await?;
        Ok(webhook)
    }

    /// Verifies an inbound webhook signature from the processor.
    ///
    /// Uses the configured `signature_max_age` for replay protection.
    /// Callers must reject the inbound webhook before any processing when
    /// this fails.
    pub fn verify_inbound(&self, payload: &[u8], signature_header: &str) -> Result<(), DomainError> {
        self.signer
            .verify(payload, signature_header, self.config.signature_max_age)
            .map_err(|e| {
                tracing::warn!(error = %e, "Inbound webhook signature rejected");
                e.into()
            })
    }
}
