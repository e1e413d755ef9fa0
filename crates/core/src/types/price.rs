//! Type-safe price representation using decimal arithmetic.
//!
//! All catalog prices are in a single store currency (USD), expressed in the
//! currency's standard unit (dollars, not cents). Arithmetic never goes
//! through floating point.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// A non-negative amount of money in the store currency.
///
/// Serialises as a string with exactly two decimal places, so an empty
/// cart's total reads `"0.00"` like any other amount.
///
/// ## Examples
///
/// ```
/// use cartwright_core::Price;
/// use rust_decimal::Decimal;
///
/// let unit = Price::new(Decimal::new(79999, 2));
/// assert_eq!(unit.times(2).to_string(), "$1599.98");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero, at cent scale.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, 2));

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut amount = self.0;
        amount.rescale(2);
        Serialize::serialize(&amount, serializer)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        self.times(rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(45000).to_string(), "$450.00");
        assert_eq!(Price::new(Decimal::new(21005, 1)).to_string(), "$2100.50");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_times_is_exact() {
        // 0.1 * 3 would drift in f64
        let dime = Price::from_cents(10);
        assert_eq!(dime.times(3), Price::from_cents(30));
        assert_eq!(dime * 0, Price::ZERO);
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::from_cents(150), Price::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(400));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_cents(79999)).ok();
        assert_eq!(json.as_deref(), Some("\"799.99\""));
    }

    #[test]
    fn test_serializes_zero_and_whole_amounts_with_cents() {
        let zero = serde_json::to_string(&Price::ZERO).ok();
        assert_eq!(zero.as_deref(), Some("\"0.00\""));

        let whole = serde_json::to_string(&Price::new(Decimal::from(71))).ok();
        assert_eq!(whole.as_deref(), Some("\"71.00\""));

        let empty: Price = core::iter::empty().sum();
        assert_eq!(serde_json::to_string(&empty).ok().as_deref(), Some("\"0.00\""));
        assert_eq!(Price::default(), Price::ZERO);
    }
}
