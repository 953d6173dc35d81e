//! Money and currency value objects.
//!
//! Amounts are fixed-point decimals at the currency's minor-unit precision.
//! Floats never touch monetary values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use super::ValidationError;

/// Currency codes (ISO 4217).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    SEK,
    NOK,
    DKK,
    PLN,
    BRL,
    MXN,
    SGD,
    HKD,
    NZD,
}

impl Currency {
    /// Get currency code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::JPY => "JPY",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::CHF => "CHF",
            Self::SEK => "SEK",
            Self::NOK => "NOK",
            Self::DKK => "DKK",
            Self::PLN => "PLN",
            Self::BRL => "BRL",
            Self::MXN => "MXN",
            Self::SGD => "SGD",
            Self::HKD => "HKD",
            Self::NZD => "NZD",
        }
    }

    /// Decimal places of the minor unit (0 for zero-decimal currencies).
    pub fn minor_units(&self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a 3-letter code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFormat` for unknown codes.
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code.to_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "JPY" => Ok(Self::JPY),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "CHF" => Ok(Self::CHF),
            "SEK" => Ok(Self::SEK),
            "NOK" => Ok(Self::NOK),
            "DKK" => Ok(Self::DKK),
            "PLN" => Ok(Self::PLN),
            "BRL" => Ok(Self::BRL),
            "MXN" => Ok(Self::MXN),
            "SGD" => Ok(Self::SGD),
            "HKD" => Ok(Self::HKD),
            "NZD" => Ok(Self::NZD),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("Unknown currency code: {}", other),
            )),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary amount in a specific currency.
///
/// # Invariants
///
/// - The amount is rounded to the currency's minor-unit precision at
///   construction; arithmetic between `Money` values of the same currency
///   cannot introduce extra precision.
/// - Arithmetic across currencies is a programming error and panics in
///   debug builds; validated call sites compare currencies first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a monetary amount, rounding to the currency's minor units.
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(currency.minor_units()),
            currency,
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// The decimal amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// True if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// True if the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.amount == Decimal::ZERO
    }

    /// Checked subtraction; `None` if currencies differ or result is negative.
    pub fn checked_sub(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency || self.amount < other.amount {
            return None;
        }
        Some(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// True if both values share a currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        debug_assert_eq!(self.currency, rhs.currency, "currency mismatch in Money::add");
        Money {
            amount: self.amount + rhs.amount,
            currency: self.currency,
        }
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        debug_assert_eq!(self.currency, rhs.currency, "currency mismatch in Money::sub");
        Money {
            amount: self.amount - rhs.amount,
            currency: self.currency,
        }
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.currency != other.currency {
            return None;
        }
        self.amount.partial_cmp(&other.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
