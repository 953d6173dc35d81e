//! Payment method enumeration.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Instrument used to fund a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    DigitalWallet,
}

impl PaymentMethod {
    /// Wire representation of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::DigitalWallet => "digital_wallet",
        }
    }

    /// Parse from the wire representation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFormat` for unknown values.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "digital_wallet" => Ok(PaymentMethod::DigitalWallet),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("Unknown payment method: {}", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_all_methods() {
        for method in [
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::BankTransfer,
            PaymentMethod::DigitalWallet,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()).unwrap(), method);
        }
    }

    #[test]
    fn parse_rejects_unknown_method() {
        assert!(PaymentMethod::parse("carrier_pigeon").is_err());
        assert!(PaymentMethod::parse("").is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");
    }
}
