//! Ledger configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ValidationError;

/// Ledger configuration (validation bounds)
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerLimitsConfig {
    /// Upper bound on a single payment amount, in the currency's major unit
    #[serde(default = "default_amount_ceiling")]
    pub amount_ceiling: Decimal,
}

impl LedgerLimitsConfig {
    /// Validate ledger configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount_ceiling <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmountCeiling);
        }
        Ok(())
    }
}

impl Default for LedgerLimitsConfig {
    fn default() -> Self {
        Self {
            amount_ceiling: default_amount_ceiling(),
        }
    }
}

fn default_amount_ceiling() -> Decimal {
    // 10,000.00
    Decimal::new(1_000_000, 2)
}
