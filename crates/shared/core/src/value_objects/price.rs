//! Exact decimal price representation
//!
//! Prices arrive from the exchange as decimal text. They are parsed once at the
//! boundary into `rust_decimal::Decimal` and compared numerically from then on,
//! so "100.5" and "100.50" address the same price level.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::{Quantity, ValueError, parse_decimal};

/// Price of a depth level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Wrap an already validated decimal
    pub fn new(value: Decimal) -> Result<Self, ValueError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValueError::Negative("price"));
        }
        Ok(Self(value.normalize()))
    }

    /// Create from integer (whole number)
    pub fn from_int(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse from exchange text (e.g., "0.00300888")
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        Self::new(parse_decimal(s)?)
    }

    /// Get the inner decimal
    #[inline]
    pub fn inner(self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Notional value of `qty` at this price; None if it leaves decimal range
    #[inline]
    pub fn checked_mul_qty(self, qty: Quantity) -> Option<Notional> {
        self.0.checked_mul(qty.inner()).map(Notional)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Price::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ValueError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

/// Difference between two prices (e.g. a spread).
///
/// Kept as a raw decimal since a crossed book yields a negative value.
impl Sub for Price {
    type Output = Decimal;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

/// Notional value of a level (price × quantity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notional(Decimal);

impl Notional {
    pub const ZERO: Notional = Notional(Decimal::ZERO);

    #[inline]
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl Notional {
    #[inline]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Notional)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Notional)
    }
}

impl Default for Notional {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Notional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
