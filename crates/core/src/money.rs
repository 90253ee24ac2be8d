//! Fixed-point money arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` values kept at [`LEDGER_SCALE`]; ratios
//! and percentages at [`RATIO_SCALE`]. Every rounding step in the crate is
//! half-up (midpoint away from zero) and goes through the helpers below.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::{LEDGER_SCALE, RATIO_SCALE};
use crate::errors::{Error, Result, ValidationError};

/// Rounds a ledger amount to two decimal places, half-up.
pub fn round_ledger(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a ratio or percentage to four decimal places, half-up.
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATIO_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole` at ratio scale; zero when `whole` is zero.
pub fn ratio_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round_ratio(part / whole)
}

/// An amount tagged with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount: round_ledger(amount),
            currency: currency.into().trim().to_uppercase(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Parses an amount such as `"12.345"`; the value is rounded to ledger scale.
    pub fn parse(amount: &str, currency: impl Into<String>) -> Result<Self> {
        let value = Decimal::from_str(amount.trim()).map_err(ValidationError::DecimalParse)?;
        Ok(Self::new(value, currency))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Scales the amount by a ratio, rounding the product half-up.
    pub fn mul_ratio(&self, ratio: Decimal) -> Money {
        Money::new(self.amount * ratio, self.currency.clone())
    }

    /// Share of `whole` this amount represents, at ratio scale.
    pub fn ratio_of(&self, whole: &Money) -> Result<Decimal> {
        self.ensure_same_currency(whole)?;
        Ok(ratio_of(self.amount, whole.amount))
    }

    pub fn negate(&self) -> Money {
        Money::new(-self.amount, self.currency.clone())
    }

    pub fn abs(&self) -> Money {
        Money::new(self.amount.abs(), self.currency.clone())
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(Error::Validation(ValidationError::CurrencyMismatch(
                self.currency.clone(),
                other.currency.clone(),
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}
