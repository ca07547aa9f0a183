use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// A signed amount in the ledger currency, always held at two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid amount: '{0}'")]
pub struct ParseMoneyError(pub String);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money::from_decimal(Decimal::new(cents, 2))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        let mut d = decimal.round_dp(2);
        d.rescale(2);
        Money(d)
    }

    pub fn zero() -> Self {
        Money::from_decimal(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Accepts plain decimals plus the usual statement decorations:
    /// `$`, thousands separators, and accounting parentheses for negatives.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed
            .strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
        {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };
        let clean = body.replace([',', '$', ' '], "");
        if clean.is_empty() {
            return Err(ParseMoneyError(s.to_string()));
        }
        let mut dec = Decimal::from_str(&clean).map_err(|_| ParseMoneyError(s.to_string()))?;
        if negative {
            dec = -dec;
        }
        Ok(Money::from_decimal(dec))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}
