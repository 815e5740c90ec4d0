//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! Floating point cannot represent currency exactly (`0.1 + 0.2 !=
//! 0.3`), and the aggregator must guarantee that the sum of displayed
//! per-day totals equals the monthly total to the cent. Every monetary
//! value in the system is therefore an integer number of centavos; only
//! the HTTP boundary converts to two-decimal display form.
//!
//! ## Usage
//! ```rust
//! use verde_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let total = price + Money::from_cents(500); // $15.99
//! assert_eq!(Money::parse("10.99").unwrap(), price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for refunds and corrections
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support (serialized as plain cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (pesos) portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a two-decimal string such as `"123.45"`, `"80"` or `"-5.5"`.
    ///
    /// At most two fraction digits are accepted; `"1.5"` means $1.50.
    /// This is the only sanctioned path from external decimal input to
    /// `Money` — never go through `f64`.
    ///
    /// ## Example
    /// ```rust
    /// use verde_core::money::Money;
    ///
    /// assert_eq!(Money::parse("100.01").unwrap().cents(), 10001);
    /// assert_eq!(Money::parse("-5.5").unwrap().cents(), -550);
    /// assert!(Money::parse("12.345").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        let invalid = || ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: "must be a decimal number with at most two fraction digits".to_string(),
        };

        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        // "1.5" means 50 cents, "1.05" means 5 cents
        let frac_cents: i64 = if frac.is_empty() {
            0
        } else {
            let parsed: i64 = frac.parse().map_err(|_| invalid())?;
            if frac.len() == 1 {
                parsed * 10
            } else {
                parsed
            }
        };

        let cents = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Multiplies money by a quantity (line total = unit price × quantity).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Extracts the tax portion from a tax-inclusive total.
    ///
    /// Mexican retail prices include IVA, so a global invoice reports
    /// `subtotal = total / 1.16` and `tax = total - subtotal`. Implemented
    /// in integer arithmetic with half-up rounding on the subtotal:
    /// `subtotal = (total * 10000 + half) / (10000 + bps)`.
    ///
    /// ## Example
    /// ```rust
    /// use verde_core::money::Money;
    ///
    /// let total = Money::from_cents(11600); // $116.00 IVA included
    /// let tax = total.extract_included_tax(1600); // 16%
    /// assert_eq!(tax.cents(), 1600); // $16.00
    /// ```
    pub fn extract_included_tax(&self, rate_bps: u32) -> Money {
        // i128 intermediate to prevent overflow on large totals
        let divisor = 10_000i128 + rate_bps as i128;
        let subtotal = (self.0 as i128 * 10_000 + divisor / 2) / divisor;
        Money(self.0 - subtotal as i64)
    }

    /// Divides by a count with half-up rounding. Returns zero for a zero
    /// count, which is the aggregation semantic for "average of nothing".
    pub fn divide_rounded(&self, count: i64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        let half = count / 2;
        Money((self.0 + half) / count)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. Wire formatting belongs to the DTO layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.units().abs(), self.cents_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
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
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_parse_decimal_strings() {
        assert_eq!(Money::parse("123.45").unwrap().cents(), 12345);
        assert_eq!(Money::parse("80").unwrap().cents(), 8000);
        assert_eq!(Money::parse("0.05").unwrap().cents(), 5);
        assert_eq!(Money::parse("1.5").unwrap().cents(), 150);
        assert_eq!(Money::parse("-5.50").unwrap().cents(), -550);
        assert_eq!(Money::parse(" 100.01 ").unwrap().cents(), 10001);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse(".").is_err());
        assert!(Money::parse("12.345").is_err());
        assert!(Money::parse("1,000").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.2e3").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_extract_included_tax() {
        // $116.00 with 16% IVA included -> $16.00 tax
        let total = Money::from_cents(11600);
        assert_eq!(total.extract_included_tax(1600).cents(), 1600);

        // $100.00 -> subtotal 86.21, tax 13.79
        let total = Money::from_cents(10000);
        assert_eq!(total.extract_included_tax(1600).cents(), 1379);

        assert_eq!(Money::zero().extract_included_tax(1600).cents(), 0);
    }

    #[test]
    fn test_divide_rounded() {
        assert_eq!(Money::from_cents(8000).divide_rounded(2).cents(), 4000);
        assert_eq!(Money::from_cents(100).divide_rounded(3).cents(), 33);
        assert_eq!(Money::from_cents(101).divide_rounded(2).cents(), 51);
        assert_eq!(Money::from_cents(500).divide_rounded(0).cents(), 0);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    }
}
