//! Processor client port for the external payment processor.
//!
//! The gateway never speaks the processor's wire protocol directly; it
//! depends only on this interface and its error taxonomy. Every call made
//! through it is wrapped by the circuit breaker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{DomainError, Money};

/// Port for the external payment processor.
///
/// Implementations must ensure operations are idempotent on their side;
/// the ledger may reissue a failed call verbatim.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Authorize and capture in a single step.
    ///
    /// Returns the processor transaction id for future reference.
    async fn charge(&self, request: ChargeRequest) -> Result<ProcessorCharge, ProcessorError>;

    /// Reserve funds without capturing them.
    async fn authorize(&self, request: ChargeRequest) -> Result<ProcessorCharge, ProcessorError>;

    /// Capture previously authorized funds.
    async fn capture(&self, transaction_id: &str) -> Result<ProcessorOutcome, ProcessorError>;

    /// Return captured funds to the customer.
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Result<ProcessorOutcome, ProcessorError>;

    /// Cancel an authorization before capture.
    async fn void(&self, transaction_id: &str) -> Result<ProcessorOutcome, ProcessorError>;
}

/// Request to charge or authorize an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount and currency to move.
    pub amount: Money,

    /// Opaque tokenized payment instrument.
    pub method_token: String,
}

/// Result of a charge or authorize call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorCharge {
    /// Processor-side transaction id.
    pub transaction_id: String,

    /// Approval details.
    pub outcome: ProcessorOutcome,
}

/// Approval details returned by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorOutcome {
    /// Processor approval code.
    pub approval_code: String,

    /// Human-readable processor message.
    pub message: String,
}

/// Errors from processor operations.
///
/// The classification drives circuit-breaker accounting: only `Transient`
/// failures count toward the breaker threshold. A decline is a business
/// answer, not an outage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// Processor declined the operation (insufficient funds, bad card, ...).
    #[error("Processor declined ({code}): {message}")]
    Declined { code: String, message: String },

    /// Network, timeout, or 5xx-class failure; safe to assume the
    /// dependency is unhealthy.
    #[error("Transient processor failure: {0}")]
    Transient(String),

    /// Credential failure; fatal to the call but not an outage.
    #[error("Processor authentication failed: {0}")]
    Auth(String),
}

impl ProcessorError {
    /// True for failures that count toward the circuit-breaker threshold.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessorError::Transient(_))
    }
}

impl From<ProcessorError> for DomainError {
    fn from(err: ProcessorError) -> Self {
        let domain_err = DomainError::external_service(err.to_string());
        match err {
            ProcessorError::Declined { code, .. } => domain_err.with_detail("decline_code", code),
            ProcessorError::Transient(_) => domain_err.with_detail("transient", "true"),
            ProcessorError::Auth(_) => domain_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    // Trait object safety test
    #[test]
    fn processor_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn ProcessorClient) {}
    }

    #[test]
    fn only_transient_errors_trip_the_breaker() {
        assert!(ProcessorError::Transient("connection reset".into()).is_transient());

        assert!(!ProcessorError::Declined {
            code: "insufficient_funds".into(),
            message: "Insufficient funds".into()
        }
        .is_transient());
        assert!(!ProcessorError::Auth("bad api key".into()).is_transient());
    }

    #[test]
    fn declined_converts_with_decline_code_detail() {
        let err: DomainError = ProcessorError::Declined {
            code: "card_expired".into(),
            message: "Card expired".into(),
        }
        .into();

        assert_eq!(err.code, ErrorCode::ExternalServiceError);
        assert_eq!(err.details.get("decline_code"), Some(&"card_expired".to_string()));
    }

    #[test]
    fn error_display_mentions_cause() {
        let err = ProcessorError::Transient("timeout after 10s".into());
        assert!(err.to_string().contains("timeout after 10s"));
    }
}
