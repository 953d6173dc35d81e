//! Webhook signature error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors produced while signing or verifying webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Invalid signature header: {0}")]
    ParseError(String),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Signature timestamp too old")]
    TimestampOutOfRange,

    #[error("Signature timestamp in the future")]
    TimestampInFuture,
}

impl From<SignatureError> for DomainError {
    fn from(err: SignatureError) -> Self {
        DomainError::new(ErrorCode::InvalidSignature, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_error_converts_to_domain_error() {
        let err: DomainError = SignatureError::InvalidSignature.into();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
    }

    #[test]
    fn parse_error_carries_reason() {
        let err = SignatureError::ParseError("missing timestamp".to_string());
        assert!(err.to_string().contains("missing timestamp"));
    }
}
