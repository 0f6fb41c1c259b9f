//! Type-safe price representation using decimal arithmetic.
//!
//! Every canteen on campus prices in Indian rupees, so `Price` carries no
//! currency code. Arithmetic stays in [`Decimal`]; only display rounds.
//! Amounts come from visitors, so every operation is checked and reports
//! overflow as `None`.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency symbol used for display.
pub const RUPEE_SYMBOL: &str = "₹";

/// An amount in Indian rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of paise.
    #[must_use]
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::new(paise, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `self + rhs`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `self × quantity`, or `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Multiply by a rate (e.g. a tax rate), keeping full precision.
    /// `None` on overflow.
    #[must_use]
    pub fn checked_scale(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(Self)
    }

    /// Sum of `prices`, or `None` if any partial sum overflows.
    pub fn checked_sum(prices: impl IntoIterator<Item = Self>) -> Option<Self> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Format for display with two decimal places (e.g. `₹105.00`).
    ///
    /// Rounds half away from zero, the way a printed bill does.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rounded = self
            .0
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        format!("{RUPEE_SYMBOL}{rounded}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_two_places() {
        assert_eq!(Price::new(Decimal::from(105)).display(), "₹105.00");
        assert_eq!(Price::from_paise(4_250).display(), "₹42.50");
    }

    #[test]
    fn test_display_rounds_half_up() {
        // 0.125 rounds to 0.13 on a bill, not to the even 0.12
        assert_eq!(Price::new(Decimal::new(125, 3)).display(), "₹0.13");
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let a = Price::new(Decimal::new(1, 1));
        let b = Price::new(Decimal::new(2, 1));
        assert_eq!(a.checked_add(b), Some(Price::new(Decimal::new(3, 1))));
        assert_eq!(
            Price::from_paise(1_999).checked_mul(3),
            Some(Price::from_paise(5_997))
        );
    }

    #[test]
    fn test_checked_sum() {
        let total = Price::checked_sum([Price::from_paise(100), Price::from_paise(250)]);
        assert_eq!(total, Some(Price::from_paise(350)));
        assert_eq!(Price::checked_sum([]), Some(Price::ZERO));
    }

    #[test]
    fn test_overflow_is_none() {
        let max = Price::new(Decimal::MAX);
        assert_eq!(max.checked_add(Price::from_paise(100)), None);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(max.checked_scale(Decimal::TWO), None);
        assert_eq!(Price::checked_sum([max, max]), None);
        assert_eq!(max.checked_mul(1), Some(max));
    }

    #[test]
    fn test_is_negative() {
        assert!(Price::from_paise(-1).is_negative());
        assert!(!Price::ZERO.is_negative());
        assert!(!Price::from_paise(1).is_negative());
    }

    #[test]
    fn test_deserializes_from_string() {
        let price: Price = serde_json::from_str("\"99.50\"").unwrap();
        assert_eq!(price, Price::from_paise(9_950));
    }
}
