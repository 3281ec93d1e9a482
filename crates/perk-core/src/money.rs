//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A loyalty wallet accumulates thousands of small movements per          │
//! │  customer. Any drift compounds into real money.                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every balance, charge, and discount is an i64 in minor units.        │
//! │    Rounding happens exactly once, explicitly, per discount step.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use perk_core::money::Money;
//!
//! let amount = Money::from_cents(10_000); // 100.00
//! let after = amount.apply_percentage(20); // 80.00
//! assert_eq!(after.cents(), 8_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for withdrawals and ledger math
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary value in the system flows through this type: wallet
/// balances, ledger movements, charge amounts, discount values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use perk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps the value to a minimum of zero.
    ///
    /// Discount stacking may push a charge below zero; the final charge is
    /// never negative.
    ///
    /// ## Example
    /// ```rust
    /// use perk_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-250).clamp_non_negative().cents(), 0);
    /// assert_eq!(Money::from_cents(250).clamp_non_negative().cents(), 250);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns `percent` percent of this amount, rounded half-up.
    ///
    /// ## Implementation
    /// Integer math: `(cents * percent + 50) / 100`. The `+50` provides
    /// rounding (50/100 = 0.5). i128 intermediate prevents overflow on
    /// large amounts.
    pub fn percentage_of(&self, percent: i64) -> Money {
        let part = (self.0 as i128 * percent as i128 + 50) / 100;
        Money::from_cents(part as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use perk_core::money::Money;
    ///
    /// let amount = Money::from_cents(10_000); // 100.00
    /// assert_eq!(amount.apply_percentage(20).cents(), 8_000); // 20% off
    /// ```
    pub fn apply_percentage(&self, percent: i64) -> Money {
        *self - self.percentage_of(percent)
    }

    /// Checks whether two amounts match within
    /// [`PRICE_MATCH_TOLERANCE_CENTS`](crate::PRICE_MATCH_TOLERANCE_CENTS).
    ///
    /// Used by the legacy price-matched bundle path: a charge "equal" to a
    /// package price within the tolerance purchases the package.
    #[inline]
    pub const fn matches_within_cent(&self, other: Money) -> bool {
        (self.0 - other.0).abs() <= crate::PRICE_MATCH_TOLERANCE_CENTS
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Currency symbols come from the external
/// settings store and are applied by the display layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Negation, for turning a withdrawal amount into a signed ledger movement.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_percentage_discount() {
        let amount = Money::from_cents(10_000); // 100.00
        assert_eq!(amount.apply_percentage(20).cents(), 8_000);
        assert_eq!(amount.apply_percentage(0).cents(), 10_000);
        assert_eq!(amount.apply_percentage(100).cents(), 0);
    }

    #[test]
    fn test_percentage_rounding_half_up() {
        // 33.33 at 10% = 3.333 -> 3.33; 33.35 at 10% = 3.335 -> 3.34
        assert_eq!(Money::from_cents(3333).percentage_of(10).cents(), 333);
        assert_eq!(Money::from_cents(3335).percentage_of(10).cents(), 334);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-1).clamp_non_negative().cents(), 0);
        assert_eq!(Money::zero().clamp_non_negative().cents(), 0);
        assert_eq!(Money::from_cents(1).clamp_non_negative().cents(), 1);
    }

    #[test]
    fn test_matches_within_cent() {
        let price = Money::from_cents(5000);
        assert!(price.matches_within_cent(Money::from_cents(5000)));
        assert!(price.matches_within_cent(Money::from_cents(5001)));
        assert!(price.matches_within_cent(Money::from_cents(4999)));
        assert!(!price.matches_within_cent(Money::from_cents(5002)));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }
}
