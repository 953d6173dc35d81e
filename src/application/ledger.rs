//! PaymentLedger - payment lifecycle operations.
//!
//! Every mutating operation follows the same shape: load the payment,
//! check the status guard, call the processor through the circuit breaker,
//! apply the aggregate mutation, persist it, then emit a webhook event.
//! The processor call is the sole side-effecting step; nothing is
//! persisted until it has returned success.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapters::resilience::CircuitBreakerRegistry;
use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, ExternalId, Money, PaymentId,
};
use crate::domain::payment::{Payment, PaymentEvent, PaymentEventType, PaymentMethod, PaymentStatus};
use crate::ports::{ChargeRequest, CircuitBreaker, PaymentStore, ProcessorClient, ProcessorError};

use super::WebhookDeliveryEngine;

/// Dependency name the processor breaker is registered under.
const PROCESSOR_DEPENDENCY: &str = "processor";

/// Configuration for ledger validation and event emission.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Upper bound on a single payment amount.
    pub amount_ceiling: Decimal,

    /// Subscriber endpoint that receives lifecycle events.
    pub webhook_endpoint: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            amount_ceiling: Decimal::new(1_000_000, 2), // 10,000.00
            webhook_endpoint: String::new(),
        }
    }
}

/// Command to create a payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    /// Caller-facing unique identifier.
    pub external_id: String,

    /// Amount in the currency's major unit.
    pub amount: Decimal,

    /// 3-letter currency code.
    pub currency: String,

    /// Payment method wire name.
    pub payment_method: String,

    /// Customer email, optional.
    pub customer_email: Option<String>,

    /// Opaque caller metadata.
    pub metadata: HashMap<String, String>,
}

/// Outcome of a circuit-breaker-guarded processor call.
enum GuardedCallError {
    CircuitOpen,
    Processor(ProcessorError),
}

impl From<GuardedCallError> for DomainError {
    fn from(err: GuardedCallError) -> Self {
        match err {
            GuardedCallError::CircuitOpen => DomainError::circuit_open(PROCESSOR_DEPENDENCY),
            GuardedCallError::Processor(e) => e.into(),
        }
    }
}

/// Payment lifecycle engine.
///
/// Owns the `Payment` entity: enforces status transitions, computes
/// refund/void eligibility, and calls the processor through the circuit
/// breaker.
pub struct PaymentLedger {
    store: Arc<dyn PaymentStore>,
    processor: Arc<dyn ProcessorClient>,
    breakers: Arc<CircuitBreakerRegistry>,
    delivery: Arc<WebhookDeliveryEngine>,
    config: LedgerConfig,
}

impl PaymentLedger {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        processor: Arc<dyn ProcessorClient>,
        breakers: Arc<CircuitBreakerRegistry>,
        delivery: Arc<WebhookDeliveryEngine>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            processor,
            breakers,
            delivery,
            config,
        }
    }

    /// Creates a payment in `Pending` after validating the request.
    ///
    /// Emits `payment.created`. No processor interaction happens here.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for bad amount, currency, method, or email
    /// - `Conflict` if the external id is already taken
    pub async fn create(&self, request: CreatePaymentRequest) -> Result<Payment, DomainError> {
        let currency = Currency::from_code(&request.currency)?;
        let payment_method = PaymentMethod::parse(&request.payment_method)?;
        let external_id = ExternalId::new(request.external_id)?;

        if request.amount <= Decimal::ZERO {
            return Err(DomainError::validation(
                "amount",
                "Amount must be greater than zero",
            ));
        }
        if request.amount > self.config.amount_ceiling {
            return Err(DomainError::validation(
                "amount",
                format!(
                    "Amount {} exceeds the maximum of {}",
                    request.amount, self.config.amount_ceiling
                ),
            ));
        }
        if let Some(email) = &request.customer_email {
            if !is_valid_email(email) {
                return Err(DomainError::validation("customer_email", "Invalid email address"));
            }
        }

        let payment = Payment::create(
            PaymentId::new(),
            external_id,
            Money::new(request.amount, currency),
            payment_method,
            request.customer_email,
            request.metadata,
        );
        self.store.insert(&payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            external_id = %payment.external_id,
            amount = %payment.amount,
            "Payment created"
        );

        self.emit(PaymentEventType::Created, &payment, None).await;
        Ok(payment)
    }

    /// Authorizes a pending payment, reserving funds on the instrument.
    ///
    /// Emits `payment.authorized` on success. A processor decline marks
    /// the payment `Declined` and emits `payment.failed`; transient and
    /// credential failures leave the record unchanged.
    pub async fn authorize(
        &self,
        id: &PaymentId,
        method_token: &str,
    ) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        self.ensure_status_allows(&payment, payment.status == PaymentStatus::Pending, "authorized")?;

        let request = ChargeRequest {
            amount: payment.amount,
            method_token: method_token.to_string(),
        };
        match self.guarded(self.processor.authorize(request)).await {
            Ok(charge) => {
                payment.authorize(charge.transaction_id)?;
                self.store.update(&payment).await?;
                tracing::info!(payment_id = %payment.id, "Payment authorized");
                self.emit(PaymentEventType::Authorized, &payment, None).await;
                Ok(payment)
            }
            Err(err) => self.handle_initial_failure(payment, err).await,
        }
    }

    /// Charges a pending payment: authorize and capture in one processor
    /// call.
    ///
    /// Emits `payment.captured` on success; decline handling matches
    /// `authorize`.
    pub async fn charge(&self, id: &PaymentId, method_token: &str) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        self.ensure_status_allows(&payment, payment.status == PaymentStatus::Pending, "charged")?;

        let request = ChargeRequest {
            amount: payment.amount,
            method_token: method_token.to_string(),
        };
        match self.guarded(self.processor.charge(request)).await {
            Ok(charge) => {
                payment.charge(charge.transaction_id)?;
                self.store.update(&payment).await?;
                tracing::info!(payment_id = %payment.id, "Payment charged");
                self.emit(PaymentEventType::Captured, &payment, None).await;
                Ok(payment)
            }
            Err(err) => self.handle_initial_failure(payment, err).await,
        }
    }

    /// Captures previously authorized funds.
    ///
    /// Emits `payment.captured` on success. A processor decline marks the
    /// payment `Failed` (the authorization is no longer capturable) and
    /// emits `payment.failed`.
    pub async fn capture(&self, id: &PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        self.ensure_status_allows(&payment, payment.status == PaymentStatus::Authorized, "captured")?;
        let transaction_id = self.require_transaction_id(&payment)?;

        match self.guarded(self.processor.capture(&transaction_id)).await {
            Ok(_outcome) => {
                payment.capture()?;
                self.store.update(&payment).await?;
                tracing::info!(payment_id = %payment.id, "Payment captured");
                self.emit(PaymentEventType::Captured, &payment, None).await;
                Ok(payment)
            }
            Err(GuardedCallError::Processor(ProcessorError::Declined { code, message })) => {
                payment.mark_failed()?;
                self.store.update(&payment).await?;
                tracing::warn!(
                    payment_id = %payment.id,
                    decline_code = %code,
                    "Capture declined, payment failed"
                );
                self.emit(PaymentEventType::Failed, &payment, None).await;
                Err(ProcessorError::Declined { code, message }.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Records settlement of captured funds.
    ///
    /// Settlement is reported by the processor's settlement file, not
    /// negotiated per call, so no processor interaction happens here.
    /// Emits `payment.settled`.
    pub async fn settle(&self, id: &PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        payment.settle()?;
        self.store.update(&payment).await?;
        tracing::info!(payment_id = %payment.id, "Payment settled");
        self.emit(PaymentEventType::Settled, &payment, None).await;
        Ok(payment)
    }

    /// Refunds part or all of a captured payment.
    ///
    /// Validation failures (not refundable, non-positive amount, amount
    /// beyond the remaining refundable balance) surface before the
    /// processor is contacted. On processor failure the payment record is
    /// left byte-for-byte unchanged. Emits `payment.refunded` on success.
    pub async fn refund(
        &self,
        id: &PaymentId,
        amount: Decimal,
        reason: Option<String>,
    ) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        let refund = Money::new(amount, payment.amount.currency());

        // Check eligibility up front so invalid requests never reach the
        // processor; apply_refund re-checks before mutating.
        if !payment.is_refundable() {
            return Err(DomainError::validation(
                "status",
                format!("Payment in status {:?} is not refundable", payment.status),
            ));
        }
        if !refund.is_positive() {
            return Err(DomainError::validation("amount", "Refund amount must be positive"));
        }
        if refund > payment.remaining_refund_amount() {
            return Err(DomainError::validation(
                "amount",
                format!(
                    "Refund amount {} exceeds remaining refundable amount {}",
                    refund,
                    payment.remaining_refund_amount()
                ),
            ));
        }
        let transaction_id = self.require_transaction_id(&payment)?;

        self.guarded(self.processor.refund(&transaction_id, refund))
            .await
            .map_err(DomainError::from)?;

        payment.apply_refund(refund)?;
        self.store.update(&payment).await?;
        tracing::info!(
            payment_id = %payment.id,
            refund_amount = %refund,
            refunded_total = %payment.refunded_amount,
            "Payment refunded"
        );
        self.emit(
            PaymentEventType::Refunded,
            &payment,
            reason.map(|r| ("reason", json!(r))),
        )
        .await;
        Ok(payment)
    }

    /// Voids a pending or authorized payment.
    ///
    /// The processor is only contacted when it has a transaction to
    /// cancel; a payment it never saw is voided locally. On processor
    /// failure the record is unchanged. Emits `payment.voided`.
    pub async fn void(&self, id: &PaymentId, reason: Option<String>) -> Result<Payment, DomainError> {
        let mut payment = self.load(id).await?;
        if !payment.is_voidable() {
            return Err(DomainError::validation(
                "status",
                format!("Payment in status {:?} cannot be voided", payment.status),
            ));
        }

        if let Some(transaction_id) = payment.processor_transaction_id.clone() {
            self.guarded(self.processor.void(&transaction_id))
                .await
                .map_err(DomainError::from)?;
        }

        payment.void()?;
        self.store.update(&payment).await?;
        tracing::info!(payment_id = %payment.id, "Payment voided");
        self.emit(
            PaymentEventType::Voided,
            &payment,
            reason.map(|r| ("reason", json!(r))),
        )
        .await;
        Ok(payment)
    }

    /// Looks up a payment by id.
    pub async fn get(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        self.store.find_by_id(id).await
    }

    /// Looks up a payment by its caller-facing external id.
    pub async fn get_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Payment>, DomainError> {
        self.store.find_by_external_id(external_id).await
    }

    async fn load(&self, id: &PaymentId) -> Result<Payment, DomainError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "Payment not found"))
    }

    fn ensure_status_allows(
        &self,
        payment: &Payment,
        allowed: bool,
        operation: &str,
    ) -> Result<(), DomainError> {
        if !allowed {
            return Err(DomainError::validation(
                "status",
                format!(
                    "Payment in status {:?} cannot be {}",
                    payment.status, operation
                ),
            ));
        }
        Ok(())
    }

    fn require_transaction_id(&self, payment: &Payment) -> Result<String, DomainError> {
        payment.processor_transaction_id.clone().ok_or_else(|| {
            DomainError::validation(
                "status",
                "Payment has no processor transaction to operate on",
            )
        })
    }

    /// Runs a processor call through the circuit breaker.
    ///
    /// Transient failures count toward the breaker threshold; declines and
    /// credential errors count as successes because the dependency
    /// answered.
    async fn guarded<T, Fut>(&self, call: Fut) -> Result<T, GuardedCallError>
    where
        Fut: std::future::Future<Output = Result<T, ProcessorError>>,
    {
        let breaker = self.breakers.breaker(PROCESSOR_DEPENDENCY);
        if !breaker.should_allow() {
            tracing::warn!(dependency = PROCESSOR_DEPENDENCY, "Processor call rejected, circuit open");
            return Err(GuardedCallError::CircuitOpen);
        }
        match call.await {
            Ok(value) => {
                breaker.record_success();
                Ok(value)
            }
            Err(err) => {
                if err.is_transient() {
                    breaker.record_failure();
                } else {
                    breaker.record_success();
                }
                Err(GuardedCallError::Processor(err))
            }
        }
    }

    /// Marks a pending payment `Declined` when its first processor contact
    /// is declined; other failures leave the record unchanged.
    async fn handle_initial_failure(
        &self,
        mut payment: Payment,
        err: GuardedCallError,
    ) -> Result<Payment, DomainError> {
        if let GuardedCallError::Processor(ProcessorError::Declined { code, message }) = err {
            payment.mark_declined()?;
            self.store.update(&payment).await?;
            tracing::warn!(
                payment_id = %payment.id,
                decline_code = %code,
                "Payment declined by processor"
            );
            self.emit(PaymentEventType::Failed, &payment, None).await;
            return Err(ProcessorError::Declined { code, message }.into());
        }
        Err(err.into())
    }

    /// Emits a lifecycle event through the delivery engine.
    ///
    /// The state change has already been persisted; a delivery problem
    /// falls to the retry machinery and never fails the ledger operation.
    async fn emit(
        &self,
        event_type: PaymentEventType,
        payment: &Payment,
        extra: Option<(&str, serde_json::Value)>,
    ) {
        let mut event = PaymentEvent::for_payment(event_type, payment);
        if let Some((key, value)) = extra {
            event.data[key] = value;
        }

        match self
            .delivery
            .create_event(event, Some(payment.id), &self.config.webhook_endpoint)
            .await
        {
            Ok(webhook) => {
                if let Err(err) = self.delivery.deliver(&webhook.id).await {
                    tracing::warn!(
                        webhook_id = %webhook.id,
                        error = %err,
                        "Immediate webhook delivery attempt failed"
                    );
                }
            }
            Err(err) => {
                tracing::error!(
                    payment_id = %payment.id,
                    event_type = %event_type,
                    error = %err,
                    "Failed to create webhook event"
                );
            }
        }
    }
}

/// Minimal syntactic email check: one `@`, non-empty local part, and a
/// dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
