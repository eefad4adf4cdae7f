//! # Money Module
//!
//! Provides the `Money` type and the canonical `round2` rounding function.
//!
//! ## Why Two Representations?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE FRACTIONS APPEAR                                                 │
//! │                                                                         │
//! │  Sums and products of prices are exact in integer cents:               │
//! │    30.00 × 2 = 3000 cents × 2 = 6000 cents                 (Money)     │
//! │                                                                         │
//! │  Percentages are not:                                                  │
//! │    60.00 × 8.875% = 5.325                                  (f64)       │
//! │                                                                         │
//! │  OUR RULE: fractional results pass through round2() exactly once,      │
//! │  at the component boundary, and become Money again.                    │
//! │    5.325 → round2 → 5.33 → Money(533)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use checkout_core::money::{round2, Money};
//!
//! assert_eq!(round2(1.005), 1.01);
//!
//! let price = Money::from_cents(3000);
//! let line = price * 2;
//! assert_eq!(line.cents(), 6000);
//!
//! let tax = line.percentage(8.875);
//! assert_eq!(tax.cents(), 533);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

// =============================================================================
// round2
// =============================================================================

/// Rounds half-away-from-zero to 2 decimal places.
///
/// ## The Epsilon Nudge
/// `1.005` is stored as `1.00499999999999989...`, so a naive
/// `(x * 100.0).round() / 100.0` yields `1.00`. Scaling the magnitude by
/// `1 + f64::EPSILON` first moves it onto the intended side of the half.
///
/// ## Properties
/// - `round2(1.005) == 1.01`
/// - `round2(19.999) == 20.00`
/// - `round2(round2(x)) == round2(x)` for every finite `x`
///
/// Non-finite input is returned unchanged.
pub fn round2(amount: f64) -> f64 {
    if !amount.is_finite() {
        return amount;
    }

    let magnitude = amount.abs() * (1.0 + f64::EPSILON);
    let rounded = (magnitude * 100.0).round() / 100.0;

    if amount.is_sign_negative() {
        -rounded
    } else {
        rounded
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `subtotal - discount` may go negative
///   before being clamped
/// - **Single field tuple struct**: serializes as a plain integer
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLine.unit_price ──► subtotal ──┬──► ShippingQuote (threshold)     │
/// │                                     ├──► TaxResult.taxable_base        │
/// │                                     └──► CouponDiscount.amount         │
/// │                                                                         │
/// │  All of them ──► PricingBreakdown.final_total                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a major-unit amount (e.g. dollars).
    ///
    /// This is the boundary crossing: the amount goes through [`round2`]
    /// and is then stored as whole cents.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_rounded(1.005).cents(), 101);
    /// assert_eq!(Money::from_major_rounded(-2.5).cents(), -250);
    /// ```
    pub fn from_major_rounded(amount: f64) -> Self {
        let rounded = round2(amount);
        Money((rounded * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in major units, for display and ratio math.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `max(0, self)`.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-150).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(150).clamp_non_negative().cents(), 150);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// Use [`Money::checked_multiply_quantity`] where an overflow has to be
    /// detected rather than absorbed.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `None` when `self × qty` does not fit in an `i64`.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `percent`% of this amount, rounded once through [`round2`].
    ///
    /// `percent` is a whole-number percentage: `20.0` means 20%. The division
    /// by 100 happens here and nowhere else.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000); // $100.00
    /// assert_eq!(subtotal.percentage(20.0).cents(), 2000); // $20.00
    /// ```
    pub fn percentage(&self, percent: f64) -> Money {
        Money::from_major_rounded(self.to_major() * percent / 100.0)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$12.34`. Storefront formatting handles locales.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_cases() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(19.999), 20.00);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(0.285), 0.29);
    }

    #[test]
    fn test_round2_is_away_from_zero_for_negatives() {
        assert_eq!(round2(-1.005), -1.01);
        assert_eq!(round2(-0.004), -0.0);
    }

    #[test]
    fn test_round2_idempotent() {
        let samples = [
            0.0, 0.1, 0.125, 1.005, 1.255, 3.14159, 19.999, 99.995, 1234.5678, -7.777, 1e6 / 3.0,
        ];
        for x in samples {
            let once = round2(x);
            assert_eq!(round2(once), once, "round2 not idempotent for {x}");
        }
    }

    #[test]
    fn test_round2_leaves_cent_values_alone() {
        for cents in 0..10_000 {
            let x = cents as f64 / 100.0;
            assert_eq!(round2(x), x);
        }
    }

    #[test]
    fn test_round2_non_finite_passthrough() {
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_from_major_rounded() {
        assert_eq!(Money::from_major_rounded(1.005).cents(), 101);
        assert_eq!(Money::from_major_rounded(19.999).cents(), 2000);
        assert_eq!(Money::from_major_rounded(0.1 + 0.2).cents(), 30);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_overflowing() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!((huge * 3).cents(), i64::MAX);
        assert_eq!(huge.multiply_quantity(3).cents(), i64::MAX);
        assert_eq!((huge + huge + huge).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);

        let total: Money = [huge, huge, huge].iter().sum();
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_checked_helpers_report_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_add(huge), Some(Money::from_cents(i64::MAX - 1)));
        assert_eq!(huge.checked_add(huge).and_then(|m| m.checked_add(huge)), None);
        assert_eq!(
            Money::from_cents(450).checked_multiply_quantity(3),
            Some(Money::from_cents(1350))
        );
    }

    #[test]
    fn test_percentage_divides_by_hundred_once() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.percentage(20.0).cents(), 2000);
        assert_eq!(subtotal.percentage(8.25).cents(), 825);
        assert_eq!(Money::from_cents(1000).percentage(8.25).cents(), 83);
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(4250)).unwrap();
        assert_eq!(json, "4250");
    }
}
