//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use thiserror::Error;

/// Stable product identifier, unique per product
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Result<Self, ProductIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ProductIdError::Empty); }
        if value.len() > 64 { return Err(ProductIdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for ProductId {
    type Error = ProductIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self { id.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductIdError {
    #[error("product id is empty")]
    Empty,
    #[error("product id is longer than 64 characters")]
    TooLong,
}

/// Money value object.
///
/// A single deployment prices in one currency, so the amount carries no
/// currency code; formatting is handled by [`crate::config::CurrencyFormat`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    /// Highest unit price the catalog and cart accept (1,000,000.00).
    pub const MAX_PRICE: Money = Money(Decimal::from_parts(100_000_000, 0, 0, false, 2));

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    /// `Money::from_minor(1299)` is 12.99.
    pub fn from_minor(minor: i64) -> Self { Self(Decimal::new(minor, 2)) }
    pub fn zero() -> Self { Self::ZERO }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn is_valid_price(&self) -> bool { !self.is_negative() && *self <= Self::MAX_PRICE }

    // Arithmetic saturates at the Decimal bounds instead of panicking.
    pub fn add(&self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn subtract(&self, other: Money) -> Money { Money(self.0.saturating_sub(other.0)) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(Decimal::from(qty))) }
    pub fn scale(&self, rate: Decimal) -> Money { Money(self.0.saturating_mul(rate)) }

    /// Two decimal places, half rounded away from zero.
    pub fn round2(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn max_zero(self) -> Money { if self.is_negative() { Money::ZERO } else { self } }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::ZERO, |acc, m| acc.add(m)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.round2().0) }
}

/// Line quantity, between one and [`Quantity::MAX`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    pub const MAX: Quantity = Quantity(999);

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX.0 { return Err(QuantityError::TooLarge(Self::MAX.0)); }
        Ok(Self(value))
    }
    /// Values are forced into `1..=MAX`.
    pub fn clamped(value: u32) -> Self { Self(value.clamp(1, Self::MAX.0)) }
    pub fn value(&self) -> u32 { self.0 }
    /// Sum of both quantities, `None` past [`Quantity::MAX`].
    pub fn checked_add(&self, other: Quantity) -> Option<Self> {
        Self::new(self.0.checked_add(other.0)?).ok()
    }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    Zero,
    #[error("quantity cannot exceed {0}")]
    TooLarge(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id() {
        let id = ProductId::new("  p-001 ").unwrap();
        assert_eq!(id.as_str(), "p-001");
        assert_eq!(ProductId::new("   "), Err(ProductIdError::Empty));
    }

    #[test]
    fn test_money_round_half_up() {
        assert_eq!(Money::new(Decimal::new(19995, 3)).round2(), Money::from_minor(2000));
        assert_eq!(Money::new(Decimal::new(5097, 3)).round2(), Money::from_minor(510));
        assert_eq!(Money::new(Decimal::new(49542, 3)).round2(), Money::from_minor(4954));
    }

    #[test]
    fn test_money_sum_and_display() {
        let total: Money = [Money::from_minor(1299), Money::from_minor(2499)].into_iter().sum();
        assert_eq!(total, Money::from_minor(3798));
        assert_eq!(Money::new(Decimal::new(5097, 3)).to_string(), "5.10");
    }

    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::clamped(0).value(), 1);
        assert_eq!(Quantity::new(2).unwrap().checked_add(Quantity::new(3).unwrap()).map(|q| q.value()), Some(5));
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_quantity_upper_bound() {
        assert_eq!(Quantity::new(1000), Err(QuantityError::TooLarge(999)));
        assert_eq!(Quantity::clamped(u32::MAX), Quantity::MAX);
        assert_eq!(Quantity::MAX.checked_add(Quantity::ONE), None);
        assert!(serde_json::from_str::<Quantity>("1000").is_err());
    }

    #[test]
    fn test_money_arithmetic_saturates() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.multiply(5000), huge);
        assert_eq!(huge.add(huge), huge);
        assert_eq!(Money::new(Decimal::MIN).subtract(huge), Money::new(Decimal::MIN));
        assert_eq!(huge.scale(Decimal::new(15, 1)), huge);
    }

    #[test]
    fn test_price_bounds() {
        assert_eq!(Money::MAX_PRICE, Money::from_minor(100_000_000));
        assert!(Money::MAX_PRICE.is_valid_price());
        assert!(Money::ZERO.is_valid_price());
        assert!(!Money::from_minor(100_000_001).is_valid_price());
        assert!(!Money::from_minor(-1).is_valid_price());
    }
}
