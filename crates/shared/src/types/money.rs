//! Money type with fixed-point decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.
//! Intermediate sums keep full precision; callers round once, at the end,
//! with [`Money::round_to_minor`].

use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places in the currency's minor unit (cents).
pub const MINOR_UNITS: u32 = 2;

/// Represents a monetary amount in the platform's single flat currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// The amount in major units (e.g. `300.00`).
    pub amount: Decimal,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self { amount }
    }

    /// Creates an amount from an integer count of minor units (cents).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self {
            amount: Decimal::new(minor, MINOR_UNITS),
        }
    }

    /// Creates a zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Multiplies the amount by a whole count (e.g. a number of nights).
    #[must_use]
    pub fn times(self, count: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(count),
        }
    }

    /// Applies a percentage rate (e.g. `10` for ten percent), unrounded.
    #[must_use]
    pub fn percent(self, rate: Decimal) -> Self {
        Self {
            amount: self.amount * rate / Decimal::ONE_HUNDRED,
        }
    }

    /// Multiplies the amount by a fractional rate (e.g. `0.19`), unrounded.
    #[must_use]
    pub fn scale(self, rate: Decimal) -> Self {
        Self {
            amount: self.amount * rate,
        }
    }

    /// Checked [`Money::times`], `None` on overflow.
    #[must_use]
    pub fn checked_times(self, count: u32) -> Option<Self> {
        self.amount.checked_mul(Decimal::from(count)).map(Self::new)
    }

    /// Checked [`Money::percent`], `None` on overflow.
    #[must_use]
    pub fn checked_percent(self, rate: Decimal) -> Option<Self> {
        self.amount
            .checked_mul(rate)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(Self::new)
    }

    /// Checked [`Money::scale`], `None` on overflow.
    #[must_use]
    pub fn checked_scale(self, rate: Decimal) -> Option<Self> {
        self.amount.checked_mul(rate).map(Self::new)
    }

    /// Rounds half-up to the currency's minor unit.
    #[must_use]
    pub fn round_to_minor(self) -> Self {
        Self {
            amount: self
                .amount
                .round_dp_with_strategy(MINOR_UNITS, RoundingStrategy::MidpointAwayFromZero),
        }
    }

    /// Returns the rounded amount as an integer count of minor units.
    #[must_use]
    pub fn to_minor(self) -> Option<i64> {
        (self.round_to_minor().amount * Decimal::ONE_HUNDRED).to_i64()
    }

    /// Checked addition, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.amount.checked_add(other.amount).map(Self::new)
    }

    /// Checked subtraction, `None` on overflow.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.amount.checked_sub(other.amount).map(Self::new)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.amount - rhs.amount)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.round_to_minor().amount)
    }
}
