//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Decimal in, integer minor units out                     │
//! │    Product definition:  "99.99" + "5.00"  (rust_decimal, exact)        │
//! │    Resolution:          round half-to-even ONCE → 10499 minor units    │
//! │    Cart math:           integer only → totals are exact                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use anycommerce_core::money::{Money, Precision};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let price = Money::from_decimal(Decimal::from_str("104.99").unwrap(), Precision::default()).unwrap();
//! assert_eq!(price.minor(), 10499);
//!
//! let line = price * 2;
//! assert_eq!(line.format(Precision::default()), "209.98");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::TaxRate;

// =============================================================================
// Precision
// =============================================================================

/// Largest supported number of minor-unit digits.
pub const MAX_PRECISION: u32 = 9;

/// Number of minor-unit digits of the currency (2 for USD, 0 for JPY).
///
/// Construction is checked, including on deserialization, so every
/// `Precision` in the system is within `0..=MAX_PRECISION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "u32", into = "u32")]
#[ts(export)]
pub struct Precision(u32);

impl Precision {
    /// Creates a precision, rejecting more than [`MAX_PRECISION`] digits.
    pub fn new(digits: u32) -> Result<Self, ValidationError> {
        if digits > MAX_PRECISION {
            return Err(ValidationError::OutOfRange {
                field: "precision".to_string(),
                min: 0,
                max: MAX_PRECISION as i64,
            });
        }
        Ok(Precision(digits))
    }

    /// Two minor-unit digits (cents).
    #[inline]
    pub const fn cents() -> Self {
        Precision(2)
    }

    /// Returns the number of digits.
    #[inline]
    pub const fn digits(&self) -> u32 {
        self.0
    }

    /// Minor units per major unit (100 for cents).
    #[inline]
    pub const fn scale_factor(&self) -> i64 {
        10i64.pow(self.0)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::cents()
    }
}

impl TryFrom<u32> for Precision {
    type Error = ValidationError;

    fn try_from(digits: u32) -> Result<Self, Self::Error> {
        Precision::new(digits)
    }
}

impl From<Precision> for u32 {
    fn from(precision: Precision) -> Self {
        precision.0
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for modifiers and discounts
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **No currency field**: the currency is fixed per host by `CoreConfig`
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.base_price (Decimal) ─┐                                        │
/// │  Option.price_modifier (Dec.) ─┴─► resolve() ─► Money (unit price)      │
/// │                                                   │                     │
/// │                                                   ▼                     │
/// │  CartItem.unit_price × quantity ─► CartSummary.items_total             │
/// │                                                   │                     │
/// │  coupons / shipping / tax policies ───────────────┴─► balance_due      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use anycommerce_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Converts a decimal amount to minor units, rounding half-to-even.
    ///
    /// ## Bankers Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  BANKERS ROUNDING (Round Half to Even)                              │
    /// │                                                                     │
    /// │  Standard rounding always rounds 0.5 UP, causing systematic bias:  │
    /// │    0.005 → 0.01, 0.015 → 0.02, 0.025 → 0.03                        │
    /// │                                                                     │
    /// │  Bankers Rounding rounds 0.5 to nearest EVEN digit:                │
    /// │    0.005 → 0.00, 0.015 → 0.02, 0.025 → 0.02                        │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Errors
    /// `ValidationError::Overflow` if the amount does not fit in i64 minor units.
    pub fn from_decimal(amount: Decimal, precision: Precision) -> CoreResult<Self> {
        let overflow = || ValidationError::Overflow {
            field: "amount".to_string(),
        };

        let rounded =
            amount.round_dp_with_strategy(precision.digits(), RoundingStrategy::MidpointNearestEven);
        let minor = rounded
            .checked_mul(Decimal::from(precision.scale_factor()))
            .ok_or_else(overflow)?
            .trunc()
            .to_i64()
            .ok_or_else(overflow)?;

        Ok(Money(minor))
    }

    /// Returns the value as an exact decimal in major units.
    pub fn to_decimal(&self, precision: Precision) -> Decimal {
        Decimal::new(self.0, precision.digits())
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Floors the value at zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// Use [`Money::checked_mul`] where an overflow must be reported.
    ///
    /// ## Example
    /// ```rust
    /// use anycommerce_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(10499);
    /// assert_eq!(unit_price.multiply_quantity(2).minor(), 20998);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Adds, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Subtracts, `None` on overflow.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Returns `bps` basis points of this amount, rounded half-to-even.
    ///
    /// ## Example
    /// ```rust
    /// use anycommerce_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(10000);
    /// assert_eq!(subtotal.portion_bps(1000).minor(), 1000); // 10%
    /// ```
    pub fn portion_bps(&self, bps: u32) -> Money {
        let minor = div_round_half_even(self.0 as i128 * bps as i128, 10_000);
        Money(minor.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Calculates tax using Bankers Rounding (round half to even).
    ///
    /// ## Example
    /// ```rust
    /// use anycommerce_core::money::Money;
    /// use anycommerce_core::types::TaxRate;
    ///
    /// let taxable = Money::from_minor(1000);
    /// // 1000 × 8.25% = 82.5 → rounds to the even 82
    /// assert_eq!(taxable.calculate_tax(TaxRate::from_bps(825)).minor(), 82);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.portion_bps(rate.bps())
    }

    /// Formats the amount as a plain decimal string ("104.99").
    ///
    /// ## Note
    /// Currency symbols and localisation belong to the host.
    pub fn format(&self, precision: Precision) -> String {
        self.to_decimal(precision).to_string()
    }
}

/// Integer division rounding half-to-even; `den` must be positive.
fn div_round_half_even(num: i128, den: i128) -> i128 {
    let quotient = num.div_euclid(den);
    let twice_remainder = 2 * num.rem_euclid(den);

    if twice_remainder > den || (twice_remainder == den && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// The operators saturate. Cart totals go through the checked_* methods.

/// Display assumes two minor-unit digits.
///
/// ## Note
/// This is for debugging and logs. Use [`Money::format`] with the configured
/// precision for amounts the host shows to a shopper.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Precision::cents()))
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
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
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_from_decimal_exact() {
        let money = Money::from_decimal(dec("104.99"), Precision::cents()).unwrap();
        assert_eq!(money.minor(), 10499);
        assert_eq!(money.to_decimal(Precision::cents()), dec("104.99"));
    }

    #[test]
    fn test_from_decimal_rounds_half_to_even() {
        let p = Precision::cents();
        assert_eq!(Money::from_decimal(dec("0.005"), p).unwrap().minor(), 0);
        assert_eq!(Money::from_decimal(dec("0.015"), p).unwrap().minor(), 2);
        assert_eq!(Money::from_decimal(dec("0.025"), p).unwrap().minor(), 2);
        assert_eq!(Money::from_decimal(dec("0.0251"), p).unwrap().minor(), 3);
        assert_eq!(Money::from_decimal(dec("-0.015"), p).unwrap().minor(), -2);
    }

    #[test]
    fn test_from_decimal_zero_precision() {
        let yen = Precision::new(0).unwrap();
        assert_eq!(Money::from_decimal(dec("2.5"), yen).unwrap().minor(), 2);
        assert_eq!(Money::from_decimal(dec("3.5"), yen).unwrap().minor(), 4);
        assert_eq!(Money::from_minor(150).format(yen), "150");
    }

    #[test]
    fn test_from_decimal_overflow() {
        let huge = Decimal::MAX;
        assert!(Money::from_decimal(huge, Precision::cents()).is_err());
    }

    #[test]
    fn test_precision_bounds() {
        assert!(Precision::new(MAX_PRECISION).is_ok());
        assert!(Precision::new(MAX_PRECISION + 1).is_err());
        assert_eq!(Precision::default().scale_factor(), 100);
    }

    #[test]
    fn test_precision_deserialization_is_checked() {
        let ok: Precision = serde_json::from_str("3").unwrap();
        assert_eq!(ok.digits(), 3);
        assert!(serde_json::from_str::<Precision>("12").is_err());
    }

    #[test]
    fn test_format() {
        let p = Precision::cents();
        assert_eq!(Money::from_minor(10499).format(p), "104.99");
        assert_eq!(Money::from_minor(500).format(p), "5.00");
        assert_eq!(Money::from_minor(-550).format(p), "-5.50");
        assert_eq!(Money::from_minor(0).format(p), "0.00");
        assert_eq!(Money::from_minor(1099).to_string(), "10.99");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);
        assert_eq!((b - a).non_negative(), Money::zero());

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_portion_bps_half_even() {
        // 1 × 50% = 0.5 → 0 ; 3 × 50% = 1.5 → 2
        assert_eq!(Money::from_minor(1).portion_bps(5000).minor(), 0);
        assert_eq!(Money::from_minor(3).portion_bps(5000).minor(), 2);
        assert_eq!(Money::from_minor(-3).portion_bps(5000).minor(), -2);
    }

    #[test]
    fn test_tax_calculation_basic() {
        let amount = Money::from_minor(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(1000)); // 10%
        assert_eq!(tax.minor(), 100);
    }

    #[test]
    fn test_tax_calculation_with_bankers_rounding() {
        // 1000 at 8.25% = 82.5 → 82 (even), 1200 at 8.75% = 105 exactly
        assert_eq!(Money::from_minor(1000).calculate_tax(TaxRate::from_bps(825)).minor(), 82);
        assert_eq!(Money::from_minor(1200).calculate_tax(TaxRate::from_bps(875)).minor(), 105);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_minor(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.non_negative(), Money::zero());
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let big = Money::from_minor(5_000_000_000_000_000_000);
        assert_eq!(big.checked_mul(2), None);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(big.checked_mul(1), Some(big));

        // operators saturate instead of wrapping
        assert_eq!((big * 2).minor(), i64::MAX);
        assert_eq!((big + big).minor(), i64::MAX);
        assert_eq!(Money::from_minor(i64::MAX).portion_bps(20_000).minor(), i64::MAX);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_minor(10499);
        assert_eq!(unit_price.multiply_quantity(2).minor(), 20998);
    }
}
