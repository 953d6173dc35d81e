//! Webhook payload signing and verification.
//!
//! Implements HMAC-SHA256 signatures over outbound and inbound payloads
//! with timestamp validation to prevent replay attacks. The same primitive
//! signs outgoing deliveries and verifies webhooks received from the
//! processor.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Clock, SystemClock};

use super::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the signature header.
///
/// Format: `t=<timestamp>,v1=<signature>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signature (HMAC-SHA256).
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a signature header string.
    ///
    /// Unknown fields are ignored for forward compatibility.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| SignatureError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        SignatureError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        SignatureError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SignatureError::ParseError("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| SignatureError::ParseError("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Signs and verifies webhook payloads with a shared secret.
pub struct WebhookSigner {
    secret: SecretString,
    clock: Arc<dyn Clock>,
}

impl WebhookSigner {
    /// Creates a signer with the given secret and the system clock.
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Creates a signer with an injected clock (deterministic tests).
    pub fn with_clock(secret: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            clock,
        }
    }

    /// Signs a payload, producing a `t=<ts>,v1=<hex>` header value.
    pub fn sign(&self, payload: &[u8]) -> String {
        let timestamp = self.clock.now().as_unix_secs();
        let signature = self.compute_signature(timestamp, payload);
        format!("t={},v1={}", timestamp, hex::encode(signature))
    }

    /// Verifies a payload against a signature header.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate the timestamp is within `max_age` (replay protection)
    /// 3. Recompute the HMAC and compare in constant time
    ///
    /// Fails closed on any parse or mismatch error.
    ///
    /// # Errors
    ///
    /// - `ParseError` - malformed header
    /// - `TimestampOutOfRange` - older than `max_age`
    /// - `TimestampInFuture` - beyond clock-skew tolerance
    /// - `InvalidSignature` - HMAC mismatch
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        max_age: Duration,
    ) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp, max_age)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected, &header.v1_signature) {
            return Err(SignatureError::InvalidSignature);
        }

        Ok(())
    }

    fn validate_timestamp(&self, timestamp: i64, max_age: Duration) -> Result<(), SignatureError> {
        let now = self.clock.now().as_unix_secs();
        let age = now - timestamp;

        if age > max_age.as_secs() as i64 {
            return Err(SignatureError::TimestampOutOfRange);
        }

        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::TimestampInFuture);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ManualClock;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const MAX_AGE: Duration = Duration::from_secs(300);

    fn fixed_signer(unix_secs: i64) -> (WebhookSigner, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(unix_secs);
        let signer = WebhookSigner::with_clock(TEST_SECRET, clock.clone());
        (signer, clock)
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_t_and_v1() {
        let signature = "a".repeat(64);
        let header_str = format!("t=1234567890,v1={}", signature);

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let signature = "a".repeat(64);
        let header_str = format!("t=1234567890,v1={},v2=future,scheme=hmac", signature);

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(SignatureError::ParseError(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(SignatureError::ParseError(_))));
    }

    #[test]
    fn parse_header_invalid_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("t=not_a_number,v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(SignatureError::ParseError(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
        assert!(matches!(result, Err(SignatureError::ParseError(_))));
    }

    #[test]
    fn parse_header_no_equals_fails() {
        let result = SignatureHeader::parse("t1234567890");
        assert!(matches!(result, Err(SignatureError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Sign / Verify Round-trip Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_accepts_freshly_signed_payload() {
        let (signer, _clock) = fixed_signer(1_700_000_000);
        let payload = br#"{"eventId":"evt_1","eventType":"payment.captured"}"#;

        let header = signer.sign(payload);

        assert!(signer.verify(payload, &header, MAX_AGE).is_ok());
    }

    #[test]
    fn sign_produces_expected_header_shape() {
        let (signer, _clock) = fixed_signer(1_700_000_000);

        let header = signer.sign(b"{}");

        assert!(header.starts_with("t=1700000000,v1="));
        let parsed = SignatureHeader::parse(&header).unwrap();
        assert_eq!(parsed.v1_signature.len(), 32);
    }

    #[test]
    fn verify_fails_once_max_age_exceeded() {
        let (signer, clock) = fixed_signer(1_700_000_000);
        let payload = b"{}";
        let header = signer.sign(payload);

        clock.advance_secs(MAX_AGE.as_secs() as i64 + 1);

        assert_eq!(
            signer.verify(payload, &header, MAX_AGE),
            Err(SignatureError::TimestampOutOfRange)
        );
    }

    #[test]
    fn verify_succeeds_at_max_age_boundary() {
        let (signer, clock) = fixed_signer(1_700_000_000);
        let payload = b"{}";
        let header = signer.sign(payload);

        clock.advance_secs(MAX_AGE.as_secs() as i64);

        assert!(signer.verify(payload, &header, MAX_AGE).is_ok());
    }

    #[test]
    fn verify_rejects_far_future_timestamp() {
        let (signer, clock) = fixed_signer(1_700_000_000);
        let payload = b"{}";
        let header = signer.sign(payload);

        clock.set(1_700_000_000 - MAX_CLOCK_SKEW_SECS - 10);

        assert_eq!(
            signer.verify(payload, &header, MAX_AGE),
            Err(SignatureError::TimestampInFuture)
        );
    }

    #[test]
    fn verify_tolerates_small_clock_skew() {
        let (signer, clock) = fixed_signer(1_700_000_000);
        let payload = b"{}";
        let header = signer.sign(payload);

        // Verifier's clock 30s behind the signer's.
        clock.set(1_700_000_000 - 30);

        assert!(signer.verify(payload, &header, MAX_AGE).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let (signer, _clock) = fixed_signer(1_700_000_000);
        let header = signer.sign(br#"{"amount":"10.00"}"#);

        let result = signer.verify(br#"{"amount":"9999.00"}"#, &header, MAX_AGE);

        assert_eq!(result, Err(SignatureError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let clock = ManualClock::starting_at(1_700_000_000);
        let signer = WebhookSigner::with_clock(TEST_SECRET, clock.clone());
        let other = WebhookSigner::with_clock("whsec_other", clock);
        let payload = b"{}";

        let header = signer.sign(payload);

        assert_eq!(
            other.verify(payload, &header, MAX_AGE),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let (signer, _clock) = fixed_signer(1_700_000_000);
        let payload = b"{}";
        let header = signer.sign(payload);

        // Drop the last two hex characters.
        let truncated = &header[..header.len() - 2];

        assert_eq!(
            signer.verify(payload, truncated, MAX_AGE),
            Err(SignatureError::InvalidSignature)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    #[test]
    fn constant_time_compare_empty_slices() {
        let empty: &[u8] = &[];
        assert!(constant_time_compare(empty, empty));
    }
}
