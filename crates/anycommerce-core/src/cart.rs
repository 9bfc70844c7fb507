//! # Cart
//!
//! The cart entity and the mutations the cart engine performs on it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Engine call               Cart method                 State change     │
//! │  ───────────               ───────────                 ────────────     │
//! │                                                                         │
//! │  add_item() ─────────────► add_item() ───────────────► push / qty += n  │
//! │  update_quantity() ──────► update_quantity() ────────► qty = n (0: drop)│
//! │  remove_item() ──────────► remove_item() ────────────► retain(sku != s) │
//! │  apply_coupon() ─────────► apply_coupon() ───────────► coupons.insert   │
//! │  change_variation() ─────► change_variation() ───────► re-resolve line  │
//! │  clear_cart() ───────────► clear() ──────────────────► items.clear()    │
//! │                                                                         │
//! │  NOTE: every method ends in recompute(); the summary never lags the     │
//! │        item list.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Items are unique by SKU (adding the same SKU increases quantity)
//! - Every quantity is in `1..=max_item_quantity`
//! - At most `max_cart_items` lines
//! - `summary.items_total == Σ unit_price × quantity`
//!
//! Fields are private; the mutators are crate-private and only reachable
//! through [`crate::engine::CartEngine`].

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::pricing::{self, CartRules};
use crate::resolve::VerifiedProduct;
use crate::types::{CartItem, CartSummary, CheckoutPreferences, Selection};
use crate::validation::{
    normalize_coupon_code, validate_cart_size, validate_price, validate_sku,
};

/// Whether a cart has lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Empty,
    Active,
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: String,

    #[serde(default)]
    items: Vec<CartItem>,

    #[serde(default)]
    summary: CartSummary,

    #[serde(default)]
    coupons: BTreeSet<String>,

    #[serde(default)]
    preferences: CheckoutPreferences,

    #[ts(as = "String")]
    created_at: DateTime<Utc>,

    #[ts(as = "String")]
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart with a fresh UUID v4 id.
    pub(crate) fn new() -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            items: Vec::new(),
            summary: CartSummary::default(),
            coupons: BTreeSet::new(),
            preferences: CheckoutPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, sku: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.sku == sku)
    }

    pub fn summary(&self) -> &CartSummary {
        &self.summary
    }

    pub fn coupons(&self) -> &BTreeSet<String> {
        &self.coupons
    }

    pub fn preferences(&self) -> &CheckoutPreferences {
        &self.preferences
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn status(&self) -> CartStatus {
        if self.items.is_empty() {
            CartStatus::Empty
        } else {
            CartStatus::Active
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Total quantity across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a priced line, or increases the quantity of the line with the
    /// same SKU.
    pub(crate) fn add_item(&mut self, item: CartItem, rules: &CartRules) -> CoreResult<()> {
        if item.quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        validate_sku(&item.sku)?;
        validate_price("unit price", item.unit_price)?;

        let max_qty = rules.config.max_item_quantity;

        if let Some(existing) = self.items.iter_mut().find(|i| i.sku == item.sku) {
            let new_qty = existing.quantity.saturating_add(item.quantity);
            if new_qty > max_qty {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: max_qty,
                });
            }
            existing.quantity = new_qty;
        } else {
            if item.quantity > max_qty {
                return Err(CoreError::QuantityTooLarge {
                    requested: item.quantity,
                    max: max_qty,
                });
            }
            let max_items = rules.config.max_cart_items;
            validate_cart_size(self.items.len(), max_items)
                .map_err(|_| CoreError::CartTooLarge { max: max_items })?;
            self.items.push(item);
        }

        self.recompute(rules)
    }

    /// Sets a line's quantity. Zero behaves like [`Cart::remove_item`], so it
    /// is a no-op for a SKU that is not in the cart.
    pub(crate) fn update_quantity(
        &mut self,
        sku: &str,
        quantity: i64,
        rules: &CartRules,
    ) -> CoreResult<()> {
        if quantity < 0 {
            return Err(CoreError::InvalidQuantity { quantity });
        }

        if quantity == 0 {
            self.remove_item(sku, rules)?;
            return Ok(());
        }

        let Some(index) = self.items.iter().position(|i| i.sku == sku) else {
            return Err(CoreError::ItemNotFound {
                cart_id: self.id.clone(),
                sku: sku.to_string(),
            });
        };

        let max = rules.config.max_item_quantity;
        if quantity > max {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max,
            });
        }
        self.items[index].quantity = quantity;

        self.recompute(rules)
    }

    /// Removes a line. Returns whether anything was removed.
    pub(crate) fn remove_item(&mut self, sku: &str, rules: &CartRules) -> CoreResult<bool> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.sku != sku);

        let removed = self.items.len() != initial_len;
        if removed {
            self.recompute(rules)?;
        }
        Ok(removed)
    }

    /// Empties items and coupons. The summary drops to zero.
    pub(crate) fn clear(&mut self, rules: &CartRules) -> CoreResult<()> {
        self.items.clear();
        self.coupons.clear();
        self.recompute(rules)
    }

    /// Applies a coupon code. Returns `false` when it was already applied.
    pub(crate) fn apply_coupon(&mut self, code: &str, rules: &CartRules) -> CoreResult<bool> {
        let code = normalize_coupon_code(code)?;
        if self.coupons.contains(&code) {
            return Ok(false);
        }

        if let Err(reason) = rules.coupons.validate(&code, self) {
            return Err(CoreError::CouponRejected { code, reason });
        }

        self.coupons.insert(code);
        self.recompute(rules)?;
        Ok(true)
    }

    /// Removes a coupon code. Returns whether it was applied.
    pub(crate) fn remove_coupon(&mut self, code: &str, rules: &CartRules) -> CoreResult<bool> {
        let Ok(code) = normalize_coupon_code(code) else {
            return Ok(false);
        };

        let removed = self.coupons.remove(&code);
        if removed {
            self.recompute(rules)?;
        }
        Ok(removed)
    }

    pub(crate) fn set_preferences(
        &mut self,
        preferences: CheckoutPreferences,
        rules: &CartRules,
    ) -> CoreResult<()> {
        self.preferences = preferences;
        self.recompute(rules)
    }

    /// Re-resolves the line `sku` with a new selection, keeping its quantity.
    ///
    /// When the new SKU is already another line of the cart, the two lines
    /// are merged.
    pub(crate) fn change_variation(
        &mut self,
        sku: &str,
        product: &VerifiedProduct,
        selection: &Selection,
        rules: &CartRules,
    ) -> CoreResult<()> {
        let Some(index) = self.items.iter().position(|i| i.sku == sku) else {
            return Err(CoreError::ItemNotFound {
                cart_id: self.id.clone(),
                sku: sku.to_string(),
            });
        };

        let quantity = self.items[index].quantity;
        let replacement = rules
            .resolver
            .resolve_line_item(product, selection, quantity)?;

        let merge_into = self
            .items
            .iter()
            .position(|i| i.sku == replacement.sku)
            .filter(|&other| other != index);

        match merge_into {
            Some(other) => {
                let max = rules.config.max_item_quantity;
                let merged = self.items[other].quantity.saturating_add(quantity);
                if merged > max {
                    return Err(CoreError::QuantityTooLarge {
                        requested: merged,
                        max,
                    });
                }
                self.items[other].quantity = merged;
                self.items.remove(index);
            }
            None => self.items[index] = replacement,
        }

        self.recompute(rules)
    }

    /// Checks a cart received from outside the engine and recomputes its
    /// summary.
    pub(crate) fn ingest(&mut self, rules: &CartRules) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "cart id".to_string(),
            }
            .into());
        }
        if self.items.len() > rules.config.max_cart_items {
            return Err(CoreError::CartTooLarge {
                max: rules.config.max_cart_items,
            });
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            validate_sku(&item.sku)?;
            if !seen.insert(item.sku.as_str()) {
                return Err(ValidationError::InvalidFormat {
                    field: "items".to_string(),
                    reason: format!("duplicate SKU {}", item.sku),
                }
                .into());
            }
            if item.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if item.quantity > rules.config.max_item_quantity {
                return Err(CoreError::QuantityTooLarge {
                    requested: item.quantity,
                    max: rules.config.max_item_quantity,
                });
            }
            validate_price("unit price", item.unit_price)?;
            validate_price("unit base price", item.unit_base_price)?;
        }

        let mut coupons = BTreeSet::new();
        for code in &self.coupons {
            coupons.insert(normalize_coupon_code(code)?);
        }
        self.coupons = coupons;

        self.recompute(rules)
    }

    fn recompute(&mut self, rules: &CartRules) -> CoreResult<()> {
        self.summary = pricing::recompute(&self.items, &self.coupons, &self.preferences, rules)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
