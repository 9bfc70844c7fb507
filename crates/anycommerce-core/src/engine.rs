//! # Cart Engine
//!
//! Owns every cart and serializes mutations per cart.
//!
//! ## Thread Safety
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Engine Locking                                  │
//! │                                                                         │
//! │  RwLock<HashMap<cart id, Arc<Mutex<Cart>>>>                             │
//! │     │                                                                   │
//! │     ├── read lock: look up the cart handle, clone the Arc, release     │
//! │     ├── write lock: create / load / discard only                       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Mutex<Cart>  (one per cart)                                            │
//! │     │                                                                   │
//! │     ├── clone the cart into a working copy                             │
//! │     ├── run the mutation on the copy                                   │
//! │     ├── Ok  → commit the copy, return a snapshot                       │
//! │     └── Err → drop the copy, cart unchanged                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Different carts never contend with each other. Callers only ever receive
//! snapshots (clones); the engine is the single writer.
//!
//! ## Usage
//! ```rust
//! use anycommerce_core::{CartEngine, Selection, VerifiedProduct};
//! use anycommerce_core::types::{Product, VariationGroup, VariationOption};
//! use rust_decimal::Decimal;
//!
//! let product = Product::new("APP4DOG", "Dog Jacket", Decimal::new(9999, 2)).with_group(
//!     VariationGroup::new("color", "Color")
//!         .with_option(VariationOption::new("red", "Red"))
//!         .with_option(VariationOption::new("blue", "Blue").with_modifier(Decimal::new(500, 2))),
//! );
//! let product = VerifiedProduct::new(product).unwrap();
//!
//! let engine = CartEngine::default();
//! let cart = engine.create_cart();
//! let item = engine
//!     .resolver()
//!     .resolve_line_item(&product, &Selection::new().with("color", "blue"), 2)
//!     .unwrap();
//!
//! let cart = engine.add_item(cart.id(), item).unwrap();
//! assert_eq!(cart.summary().items_total.minor(), 20998);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::cart::Cart;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::pricing::{CartRules, CouponPolicy, ShippingCalculator, TaxCalculator};
use crate::resolve::{Resolver, VerifiedProduct};
use crate::types::{CartItem, CheckoutPreferences, Selection};

type CartHandle = Arc<Mutex<Cart>>;

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`CartEngine`] with injected policies.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use anycommerce_core::CartEngine;
/// use anycommerce_core::pricing::FlatRateTax;
/// use anycommerce_core::types::TaxRate;
///
/// let engine = CartEngine::builder()
///     .with_tax(Arc::new(FlatRateTax(TaxRate::from_bps(825))))
///     .build()
///     .unwrap();
/// assert!(engine.cart_ids().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CartEngineBuilder {
    rules: CartRules,
}

impl CartEngineBuilder {
    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.rules.resolver = Resolver::new(&config);
        self.rules.config = config;
        self
    }

    pub fn with_coupon_policy(mut self, policy: Arc<dyn CouponPolicy>) -> Self {
        self.rules.coupons = policy;
        self
    }

    pub fn with_shipping(mut self, calculator: Arc<dyn ShippingCalculator>) -> Self {
        self.rules.shipping = calculator;
        self
    }

    pub fn with_tax(mut self, calculator: Arc<dyn TaxCalculator>) -> Self {
        self.rules.tax = calculator;
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> CoreResult<CartEngine> {
        self.rules.config.validate()?;
        Ok(CartEngine {
            rules: self.rules,
            carts: RwLock::new(HashMap::new()),
        })
    }
}

// =============================================================================
// Cart Engine
// =============================================================================

/// The cart state engine.
#[derive(Debug)]
pub struct CartEngine {
    rules: CartRules,
    carts: RwLock<HashMap<String, CartHandle>>,
}

impl Default for CartEngine {
    fn default() -> Self {
        CartEngine {
            rules: CartRules::default(),
            carts: RwLock::new(HashMap::new()),
        }
    }
}

impl CartEngine {
    pub fn builder() -> CartEngineBuilder {
        CartEngineBuilder::default()
    }

    /// Engine with the given configuration and the default policies.
    pub fn new(config: CoreConfig) -> CoreResult<Self> {
        CartEngine::builder().with_config(config).build()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.rules.config
    }

    /// Resolver configured like this engine (separator, precision, limits).
    pub fn resolver(&self) -> &Resolver {
        &self.rules.resolver
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Creates an empty cart.
    pub fn create_cart(&self) -> Cart {
        let cart = Cart::new();
        let snapshot = cart.clone();

        self.carts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cart.id().to_string(), Arc::new(Mutex::new(cart)));

        info!(cart_id = %snapshot.id(), "Created cart");
        snapshot
    }

    /// Takes ownership of a cart snapshot from the backend.
    ///
    /// Items are validated and the summary recomputed, so totals carried by
    /// the snapshot are never trusted. Replaces a cart with the same id.
    pub fn load_cart(&self, mut cart: Cart) -> CoreResult<Cart> {
        cart.ingest(&self.rules)?;
        let snapshot = cart.clone();

        self.carts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cart.id().to_string(), Arc::new(Mutex::new(cart)));

        info!(
            cart_id = %snapshot.id(),
            lines = snapshot.line_count(),
            "Loaded cart"
        );
        Ok(snapshot)
    }

    /// Snapshot of a cart.
    pub fn cart(&self, cart_id: &str) -> CoreResult<Cart> {
        let handle = self.handle(cart_id)?;
        let cart = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cart.clone())
    }

    /// Total quantity across the cart's lines.
    pub fn item_count(&self, cart_id: &str) -> CoreResult<i64> {
        let handle = self.handle(cart_id)?;
        let cart = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cart.item_count())
    }

    /// Drops a cart. Returns whether it existed.
    pub fn discard(&self, cart_id: &str) -> bool {
        let removed = self
            .carts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(cart_id)
            .is_some();

        if removed {
            debug!(cart_id = %cart_id, "Discarded cart");
        }
        removed
    }

    /// Ids of all carts, sorted.
    pub fn cart_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .carts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a resolved line. The same SKU increases quantity.
    pub fn add_item(&self, cart_id: &str, item: CartItem) -> CoreResult<Cart> {
        let sku = item.sku.clone();
        self.mutate(cart_id, "add_item", |cart, rules| {
            debug!(cart_id = %cart_id, sku = %sku, quantity = item.quantity, "Adding item");
            cart.add_item(item, rules)
        })
    }

    /// Sets a line's quantity; `0` removes it.
    pub fn update_quantity(&self, cart_id: &str, sku: &str, quantity: i64) -> CoreResult<Cart> {
        self.mutate(cart_id, "update_quantity", |cart, rules| {
            debug!(cart_id = %cart_id, sku = %sku, quantity, "Updating quantity");
            cart.update_quantity(sku, quantity, rules)
        })
    }

    /// Removes a line. Removing an absent SKU is a no-op.
    pub fn remove_item(&self, cart_id: &str, sku: &str) -> CoreResult<Cart> {
        self.mutate(cart_id, "remove_item", |cart, rules| {
            if !cart.remove_item(sku, rules)? {
                debug!(cart_id = %cart_id, sku = %sku, "Remove of absent item ignored");
            }
            Ok(())
        })
    }

    /// Empties items and coupons; the summary is zero afterwards.
    pub fn clear_cart(&self, cart_id: &str) -> CoreResult<Cart> {
        self.mutate(cart_id, "clear_cart", |cart, rules| cart.clear(rules))
    }

    /// Applies a coupon. Re-applying an applied code is a no-op.
    pub fn apply_coupon(&self, cart_id: &str, code: &str) -> CoreResult<Cart> {
        self.mutate(cart_id, "apply_coupon", |cart, rules| {
            match cart.apply_coupon(code, rules) {
                Ok(true) => debug!(cart_id = %cart_id, code = %code, "Applied coupon"),
                Ok(false) => debug!(cart_id = %cart_id, code = %code, "Coupon already applied"),
                Err(CoreError::CouponRejected { code, reason }) => {
                    warn!(cart_id = %cart_id, code = %code, reason = %reason, "Coupon rejected");
                    return Err(CoreError::CouponRejected { code, reason });
                }
                Err(e) => return Err(e),
            }
            Ok(())
        })
    }

    /// Removes a coupon. Removing an absent code is a no-op.
    pub fn remove_coupon(&self, cart_id: &str, code: &str) -> CoreResult<Cart> {
        self.mutate(cart_id, "remove_coupon", |cart, rules| {
            if !cart.remove_coupon(code, rules)? {
                debug!(cart_id = %cart_id, code = %code, "Remove of absent coupon ignored");
            }
            Ok(())
        })
    }

    /// Replaces the checkout preferences (shipping may change).
    pub fn set_preferences(
        &self,
        cart_id: &str,
        preferences: CheckoutPreferences,
    ) -> CoreResult<Cart> {
        self.mutate(cart_id, "set_preferences", |cart, rules| {
            cart.set_preferences(preferences, rules)
        })
    }

    /// Re-resolves a line with a new selection of the same product.
    pub fn change_variation(
        &self,
        cart_id: &str,
        sku: &str,
        product: &VerifiedProduct,
        selection: &Selection,
    ) -> CoreResult<Cart> {
        self.mutate(cart_id, "change_variation", |cart, rules| {
            debug!(cart_id = %cart_id, sku = %sku, product_id = %product.id(), "Changing variation");
            cart.change_variation(sku, product, selection, rules)
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn handle(&self, cart_id: &str) -> CoreResult<CartHandle> {
        self.carts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cart_id)
            .cloned()
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))
    }

    /// Runs `op` on a working copy of the cart and commits it on success.
    fn mutate<F>(&self, cart_id: &str, op: &'static str, f: F) -> CoreResult<Cart>
    where
        F: FnOnce(&mut Cart, &CartRules) -> CoreResult<()>,
    {
        let handle = self.handle(cart_id)?;
        let mut cart = handle.lock().unwrap_or_else(PoisonError::into_inner);

        let mut working = cart.clone();
        if let Err(e) = f(&mut working, &self.rules) {
            debug!(cart_id = %cart_id, op, error = %e, "Cart mutation failed");
            return Err(e);
        }

        *cart = working;
        Ok(cart.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
