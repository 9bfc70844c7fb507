//! # Pricing Policies
//!
//! Coupon, shipping and tax rules injected into the cart engine, plus the
//! pure summary recomputation they feed.
//!
//! ## Recomputation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cart Summary Recomputation                          │
//! │                                                                         │
//! │  items ─────────► items_total = Σ unit_price × quantity                │
//! │                        │                                                │
//! │  coupons ───► CouponPolicy::discount ──► clamp to [0, items_total]     │
//! │                        │                                                │
//! │  preferences ─► ShippingCalculator::shipping                           │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  TaxCalculator::tax(items, items_total − discount)                     │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  balance_due = items + shipping + tax − discount   (floored at 0)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine assumes nothing about a policy beyond its trait contract; the
//! built-in implementations (`CouponTable`, `ShippingTable`, `FlatRateTax`)
//! are opt-in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::config::CoreConfig;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::resolve::Resolver;
use crate::types::{CartItem, CartSummary, CheckoutPreferences, TaxRate};
use crate::validation::{normalize_coupon_code, ValidationResult};

// =============================================================================
// Policy Traits
// =============================================================================

/// Decides which coupon codes a cart accepts and what they are worth.
///
/// ## Contract
/// - `discount` is never negative
/// - Adding a coupon to `coupons` never lowers the discount
///
/// Codes reach the policy already normalized (trimmed, upper-case).
pub trait CouponPolicy: Send + Sync {
    /// Checks whether `code` may be applied to `cart`.
    ///
    /// Returns the rejection reason shown to the shopper.
    fn validate(&self, code: &str, cart: &Cart) -> Result<(), String>;

    /// Total discount for the applied coupons.
    fn discount(&self, coupons: &BTreeSet<String>, items: &[CartItem], items_total: Money)
        -> Money;
}

/// Computes the shipping charge for a cart.
pub trait ShippingCalculator: Send + Sync {
    fn shipping(
        &self,
        items: &[CartItem],
        items_total: Money,
        preferences: &CheckoutPreferences,
    ) -> Money;
}

/// Computes tax on the discounted items total.
pub trait TaxCalculator: Send + Sync {
    fn tax(&self, items: &[CartItem], taxable_total: Money) -> Money;
}

// =============================================================================
// Coupons
// =============================================================================

/// Default policy: every code is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAllCoupons;

impl CouponPolicy for RejectAllCoupons {
    fn validate(&self, _code: &str, _cart: &Cart) -> Result<(), String> {
        Err("coupons are not accepted".to_string())
    }

    fn discount(&self, _: &BTreeSet<String>, _: &[CartItem], _: Money) -> Money {
        Money::zero()
    }
}

/// What a coupon takes off the items total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Discount {
    /// Basis points of the items total (1000 = 10%).
    Percentage(u32),
    /// Fixed amount in minor units.
    Fixed(Money),
}

/// A coupon definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponRule {
    pub discount: Discount,

    /// Items total required before the coupon applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_total: Option<Money>,
}

impl CouponRule {
    fn applies_to(&self, items_total: Money) -> bool {
        self.minimum_total.map_or(true, |min| items_total >= min)
    }

    fn amount(&self, items_total: Money) -> Money {
        match self.discount {
            Discount::Percentage(bps) => items_total.portion_bps(bps),
            Discount::Fixed(amount) => amount,
        }
        .non_negative()
    }
}

/// A fixed table of known coupon codes. Discounts of applied coupons add up.
///
/// A coupon whose minimum is no longer met (items were removed) stays
/// applied but contributes nothing until the total recovers.
///
/// ## Example
/// ```rust
/// use anycommerce_core::money::Money;
/// use anycommerce_core::pricing::{CouponTable, Discount};
///
/// let coupons = CouponTable::new()
///     .with_coupon("SAVE10", Discount::Percentage(1000))
///     .unwrap()
///     .with_minimum("FIVEOFF", Discount::Fixed(Money::from_minor(500)), Money::from_minor(2500))
///     .unwrap();
/// assert_eq!(coupons.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponTable {
    rules: BTreeMap<String, CouponRule>,
}

impl CouponTable {
    pub fn new() -> Self {
        CouponTable::default()
    }

    /// Adds a coupon that always applies.
    pub fn with_coupon(self, code: &str, discount: Discount) -> ValidationResult<Self> {
        self.with_rule(
            code,
            CouponRule {
                discount,
                minimum_total: None,
            },
        )
    }

    /// Adds a coupon that needs a minimum items total.
    pub fn with_minimum(
        self,
        code: &str,
        discount: Discount,
        minimum_total: Money,
    ) -> ValidationResult<Self> {
        self.with_rule(
            code,
            CouponRule {
                discount,
                minimum_total: Some(minimum_total),
            },
        )
    }

    pub fn with_rule(mut self, code: &str, rule: CouponRule) -> ValidationResult<Self> {
        self.rules.insert(normalize_coupon_code(code)?, rule);
        Ok(self)
    }

    pub fn rule(&self, code: &str) -> Option<&CouponRule> {
        self.rules.get(code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl CouponPolicy for CouponTable {
    fn validate(&self, code: &str, cart: &Cart) -> Result<(), String> {
        let rule = self
            .rules
            .get(code)
            .ok_or_else(|| "unknown coupon code".to_string())?;

        let items_total = cart.summary().items_total;
        if !rule.applies_to(items_total) {
            let minimum = rule.minimum_total.unwrap_or_default();
            return Err(format!("requires an items total of at least {minimum}"));
        }

        Ok(())
    }

    fn discount(&self, coupons: &BTreeSet<String>, _items: &[CartItem], items_total: Money) -> Money {
        coupons
            .iter()
            .filter_map(|code| self.rules.get(code))
            .filter(|rule| rule.applies_to(items_total))
            .map(|rule| rule.amount(items_total))
            .sum()
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Default calculator: shipping is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShipping;

impl ShippingCalculator for NoShipping {
    fn shipping(&self, _: &[CartItem], _: Money, _: &CheckoutPreferences) -> Money {
        Money::zero()
    }
}

/// One charge for any non-empty cart.
#[derive(Debug, Clone, Copy)]
pub struct FlatShipping(pub Money);

impl ShippingCalculator for FlatShipping {
    fn shipping(&self, items: &[CartItem], _: Money, _: &CheckoutPreferences) -> Money {
        if items.is_empty() {
            Money::zero()
        } else {
            self.0
        }
    }
}

/// Per-method rates keyed by `CheckoutPreferences::shipping_id`.
///
/// ## Rate Selection
/// ```text
/// empty cart                       → 0
/// items_total >= free_over         → 0
/// preferences.shipping_id in table → that rate
/// otherwise                        → rate of default_id, or 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingTable {
    #[serde(default)]
    pub rates: BTreeMap<String, Money>,

    #[serde(default)]
    pub default_id: Option<String>,

    #[serde(default)]
    pub free_over: Option<Money>,
}

impl ShippingTable {
    pub fn new() -> Self {
        ShippingTable::default()
    }

    pub fn with_rate(mut self, shipping_id: impl Into<String>, rate: Money) -> Self {
        self.rates.insert(shipping_id.into(), rate);
        self
    }

    pub fn with_default(mut self, shipping_id: impl Into<String>) -> Self {
        self.default_id = Some(shipping_id.into());
        self
    }

    pub fn with_free_over(mut self, threshold: Money) -> Self {
        self.free_over = Some(threshold);
        self
    }
}

impl ShippingCalculator for ShippingTable {
    fn shipping(
        &self,
        items: &[CartItem],
        items_total: Money,
        preferences: &CheckoutPreferences,
    ) -> Money {
        if items.is_empty() {
            return Money::zero();
        }
        if self.free_over.is_some_and(|threshold| items_total >= threshold) {
            return Money::zero();
        }

        preferences
            .shipping_id
            .as_deref()
            .and_then(|id| self.rates.get(id))
            .or_else(|| self.default_id.as_deref().and_then(|id| self.rates.get(id)))
            .copied()
            .unwrap_or_default()
    }
}

// =============================================================================
// Tax
// =============================================================================

/// Default calculator: no tax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxCalculator for NoTax {
    fn tax(&self, _: &[CartItem], _: Money) -> Money {
        Money::zero()
    }
}

/// A single rate applied to the taxable total, rounded half-to-even.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateTax(pub TaxRate);

impl TaxCalculator for FlatRateTax {
    fn tax(&self, _: &[CartItem], taxable_total: Money) -> Money {
        taxable_total.non_negative().calculate_tax(self.0)
    }
}

// =============================================================================
// Cart Rules
// =============================================================================

/// Everything a cart mutation needs besides the cart itself: limits,
/// resolution settings and the injected policies.
#[derive(Clone)]
pub struct CartRules {
    pub config: CoreConfig,
    pub resolver: Resolver,
    pub coupons: Arc<dyn CouponPolicy>,
    pub shipping: Arc<dyn ShippingCalculator>,
    pub tax: Arc<dyn TaxCalculator>,
}

impl CartRules {
    /// Rules with the given configuration and the default policies.
    pub fn new(config: CoreConfig) -> Self {
        CartRules {
            resolver: Resolver::new(&config),
            config,
            coupons: Arc::new(RejectAllCoupons),
            shipping: Arc::new(NoShipping),
            tax: Arc::new(NoTax),
        }
    }
}

impl Default for CartRules {
    fn default() -> Self {
        CartRules::new(CoreConfig::default())
    }
}

impl fmt::Debug for CartRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartRules")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Recomputes a cart summary from its items, coupons and preferences.
///
/// Pure: the same inputs always give the same summary. A cart with no
/// items has an all-zero summary, whatever the calculators would charge.
///
/// ## Errors
/// `Validation(Overflow)` when a line total or a sum leaves the `i64` range.
pub fn recompute(
    items: &[CartItem],
    coupons: &BTreeSet<String>,
    preferences: &CheckoutPreferences,
    rules: &CartRules,
) -> CoreResult<CartSummary> {
    if items.is_empty() {
        return Ok(CartSummary::default());
    }

    let items_total = items.iter().try_fold(Money::zero(), |total, item| {
        item.unit_price
            .checked_mul(item.quantity)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| overflow("items total"))
    })?;

    let discount_total = if coupons.is_empty() {
        Money::zero()
    } else {
        rules
            .coupons
            .discount(coupons, items, items_total)
            .non_negative()
            .min(items_total)
    };

    let shipping_total = rules
        .shipping
        .shipping(items, items_total, preferences)
        .non_negative();
    let tax_total = rules
        .tax
        .tax(items, items_total - discount_total)
        .non_negative();

    let balance_due = items_total
        .checked_add(shipping_total)
        .and_then(|total| total.checked_add(tax_total))
        .and_then(|total| total.checked_sub(discount_total))
        .ok_or_else(|| overflow("balance due"))?
        .non_negative();

    Ok(CartSummary {
        items_total,
        shipping_total,
        tax_total,
        discount_total,
        balance_due,
    })
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
