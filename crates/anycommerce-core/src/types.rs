//! # Domain Types
//!
//! Core domain types shared by the resolution engine and the cart engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ VariationGroup  │   │ VariationOption │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id, prompt     │──►│  value, prompt  │       │
//! │  │  base_price     │   │  kind, required │   │  price_modifier │       │
//! │  │  inventory      │   │  options        │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Selection     │   │    CartItem     │   │  CartSummary    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  group → value  │   │  sku, quantity  │   │  items_total    │       │
//! │  │  (ordered map)  │   │  unit_price     │   │  balance_due    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Compatibility
//! Product definitions use camelCase, and also accept the legacy backend keys
//! (`pid`, `@variations`, `@inventory`, `%attribs`, `@options`, `v`,
//! `price_mod`) as aliases. A product without `basePrice` takes its price
//! from the `zoovy:base_price` attribute, where the legacy backend keeps it.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25% (e.g., Texas sales tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Variations
// =============================================================================

/// How a variation group is presented to the shopper.
///
/// Only affects the host's rendering; every kind resolves the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum VariationKind {
    /// Drop-down list.
    #[default]
    Select,
    /// Radio buttons.
    Radio,
    /// Image swatches.
    #[serde(rename = "imgselect")]
    ImageSelect,
    /// Single checkbox (usually an optional add-on).
    Checkbox,
}

/// One selectable value of a variation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VariationOption {
    /// Value code, unique within the group. Becomes part of the SKU.
    #[serde(alias = "v")]
    pub value: String,

    /// Label shown to the shopper.
    #[serde(default)]
    pub prompt: String,

    /// Added to the product's base price when selected.
    #[serde(default, alias = "price_mod")]
    #[ts(as = "String")]
    pub price_modifier: Decimal,
}

impl VariationOption {
    /// Creates an option with no price modifier.
    pub fn new(value: impl Into<String>, prompt: impl Into<String>) -> Self {
        VariationOption {
            value: value.into(),
            prompt: prompt.into(),
            price_modifier: Decimal::ZERO,
        }
    }

    /// Sets the price modifier.
    pub fn with_modifier(mut self, modifier: Decimal) -> Self {
        self.price_modifier = modifier;
        self
    }
}

/// A named axis of product customisation (color, size, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VariationGroup {
    pub id: String,

    #[serde(default)]
    pub prompt: String,

    #[serde(default, alias = "type")]
    pub kind: VariationKind,

    /// Whether a complete selection must name this group.
    #[serde(default = "default_true")]
    pub required: bool,

    /// Options in display order.
    #[serde(default, alias = "@options")]
    pub options: Vec<VariationOption>,
}

fn default_true() -> bool {
    true
}

impl VariationGroup {
    /// Creates a required select group.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        VariationGroup {
            id: id.into(),
            prompt: prompt.into(),
            kind: VariationKind::Select,
            required: true,
            options: Vec::new(),
        }
    }

    /// Appends an option.
    pub fn with_option(mut self, option: VariationOption) -> Self {
        self.options.push(option);
        self
    }

    /// Marks the group optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Finds an option by value.
    pub fn option(&self, value: &str) -> Option<&VariationOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Inventory snapshot for one SKU, as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub sku: String,
    pub available_qty: i64,
    pub on_shelf: bool,
}

impl InventoryItem {
    /// Checks if the SKU can be shipped now.
    pub fn in_stock(&self) -> bool {
        self.available_qty > 0
    }

    /// Checks if a specific quantity is available.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.available_qty >= quantity
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product definition as received from the backend.
///
/// Products are plain data; they enter the resolution engine through
/// [`crate::resolve::VerifiedProduct`], which checks their invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "ProductWire")]
pub struct Product {
    /// Product id (PID). Prefix of every SKU of this product.
    pub id: String,

    /// Display name, copied into cart lines.
    pub name: String,

    #[ts(as = "String")]
    pub base_price: Decimal,

    /// Variation groups in authoritative order (the SKU follows this order).
    pub variation_groups: Vec<VariationGroup>,

    /// Inventory keyed by SKU.
    pub inventory: BTreeMap<String, InventoryItem>,

    /// Free-form product attributes.
    #[ts(type = "Record<string, unknown>")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Attribute holding the base price in legacy product records.
pub const LEGACY_BASE_PRICE_ATTR: &str = "zoovy:base_price";

/// Incoming shape of a product, current or legacy keys.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductWire {
    #[serde(alias = "pid")]
    id: String,

    #[serde(default)]
    name: String,

    #[serde(default)]
    base_price: Option<Decimal>,

    #[serde(default, alias = "@variations")]
    variation_groups: Vec<VariationGroup>,

    #[serde(default, alias = "@inventory")]
    inventory: BTreeMap<String, InventoryItem>,

    #[serde(default, alias = "%attribs")]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<ProductWire> for Product {
    type Error = String;

    fn try_from(wire: ProductWire) -> Result<Self, Self::Error> {
        let base_price = match wire.base_price {
            Some(price) => price,
            None => legacy_base_price(&wire.attributes).ok_or_else(|| {
                format!(
                    "product {} has neither basePrice nor a numeric {} attribute",
                    wire.id, LEGACY_BASE_PRICE_ATTR
                )
            })?,
        };

        Ok(Product {
            id: wire.id,
            name: wire.name,
            base_price,
            variation_groups: wire.variation_groups,
            inventory: wire.inventory,
            attributes: wire.attributes,
        })
    }
}

fn legacy_base_price(attributes: &BTreeMap<String, serde_json::Value>) -> Option<Decimal> {
    match attributes.get(LEGACY_BASE_PRICE_ATTR)? {
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

impl Product {
    /// Creates a product with no variations.
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_price: Decimal) -> Self {
        Product {
            id: id.into(),
            name: name.into(),
            base_price,
            variation_groups: Vec::new(),
            inventory: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Appends a variation group.
    pub fn with_group(mut self, group: VariationGroup) -> Self {
        self.variation_groups.push(group);
        self
    }

    /// Adds an inventory record.
    pub fn with_inventory(mut self, item: InventoryItem) -> Self {
        self.inventory.insert(item.sku.clone(), item);
        self
    }

    /// Finds a variation group by id.
    pub fn group(&self, id: &str) -> Option<&VariationGroup> {
        self.variation_groups.iter().find(|g| g.id == id)
    }

    /// Checks if the product has any variation groups.
    pub fn has_variations(&self) -> bool {
        !self.variation_groups.is_empty()
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Chosen option value per variation group id.
///
/// Backed by an ordered map, so the order in which entries were inserted can
/// never influence resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Selection(BTreeMap<String, String>);

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Selection(BTreeMap::new())
    }

    /// Sets the value for a group, replacing any previous choice.
    pub fn insert(&mut self, group_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(group_id.into(), value.into());
    }

    /// Builder form of [`Selection::insert`].
    pub fn with(mut self, group_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(group_id, value);
        self
    }

    /// Returns the chosen value for a group.
    pub fn get(&self, group_id: &str) -> Option<&str> {
        self.0.get(group_id).map(String::as_str)
    }

    /// Iterates entries in group id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Selection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Selection(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A priced line of a cart.
///
/// Produced by [`crate::resolve::resolve_line_item`]; prices are frozen at
/// resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub sku: String,
    pub product_id: String,
    pub name: String,
    /// Always positive inside a cart.
    pub quantity: i64,
    /// Product base price, before variation modifiers.
    pub unit_base_price: Money,
    /// Base price plus modifiers.
    pub unit_price: Money,
    /// The selection that produced `sku`.
    #[serde(default)]
    pub variations: Selection,
}

impl CartItem {
    /// Calculates the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Summary
// =============================================================================

/// Derived monetary totals of a cart. Never edited directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items_total: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub balance_due: Money,
}

// =============================================================================
// Checkout Preferences
// =============================================================================

/// Shopper choices that influence totals (shipping method, payment method).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_by: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!(!rate.is_zero());
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_selection_ignores_insertion_order() {
        let a = Selection::new().with("size", "L").with("color", "blue");
        let b = Selection::new().with("color", "blue").with("size", "L");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_product_accepts_legacy_keys() {
        let json = serde_json::json!({
            "pid": "TEST",
            "basePrice": "99.99",
            "@variations": [
                {
                    "id": "02",
                    "prompt": "Size",
                    "type": "radio",
                    "@options": [
                        { "v": "00", "prompt": "Small" },
                        { "v": "01", "prompt": "Medium", "price_mod": "2.50" }
                    ]
                }
            ],
            "%attribs": { "zoovy:prod_name": "Test" }
        });

        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.id, "TEST");
        assert_eq!(product.base_price, Decimal::from_str("99.99").unwrap());

        let group = product.group("02").unwrap();
        assert_eq!(group.kind, VariationKind::Radio);
        assert!(group.required);
        assert_eq!(
            group.option("01").unwrap().price_modifier,
            Decimal::from_str("2.50").unwrap()
        );
        assert_eq!(group.option("00").unwrap().price_modifier, Decimal::ZERO);
        assert!(product.attributes.contains_key("zoovy:prod_name"));
    }

    #[test]
    fn test_legacy_product_takes_base_price_from_attributes() {
        let json = serde_json::json!({
            "pid": "APP4DOG",
            "@variations": [
                {
                    "id": "color",
                    "@options": [ { "v": "red" }, { "v": "blue", "price_mod": 5.0 } ]
                }
            ],
            "%attribs": { "zoovy:prod_name": "Dog Jacket", "zoovy:base_price": "99.99" }
        });

        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.base_price, Decimal::from_str("99.99").unwrap());
        assert_eq!(product.variation_groups.len(), 1);

        let numeric: Product = serde_json::from_value(serde_json::json!({
            "pid": "MUG",
            "%attribs": { "zoovy:base_price": 8.5 }
        }))
        .unwrap();
        assert_eq!(numeric.base_price, Decimal::from_str("8.5").unwrap());

        // an explicit basePrice wins over the attribute
        let explicit: Product = serde_json::from_value(serde_json::json!({
            "id": "MUG",
            "basePrice": "7.00",
            "attributes": { "zoovy:base_price": "8.50" }
        }))
        .unwrap();
        assert_eq!(explicit.base_price, Decimal::from_str("7.00").unwrap());
    }

    #[test]
    fn test_product_without_any_price_is_rejected() {
        let result = serde_json::from_value::<Product>(serde_json::json!({
            "pid": "NOPRICE",
            "%attribs": { "zoovy:prod_name": "Mystery" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_product_serde_round_trip() {
        let product = Product::new("MUG", "Mug", Decimal::new(850, 2)).with_group(
            VariationGroup::new("size", "Size").with_option(VariationOption::new("L", "Large")),
        );
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["basePrice"], "8.50");

        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn test_cart_item_line_total() {
        let item = CartItem {
            sku: "APP4DOG-blue".to_string(),
            product_id: "APP4DOG".to_string(),
            name: "Dog Jacket".to_string(),
            quantity: 2,
            unit_base_price: Money::from_minor(9999),
            unit_price: Money::from_minor(10499),
            variations: Selection::new().with("color", "blue"),
        };
        assert_eq!(item.line_total(), Money::from_minor(20998));
    }

    #[test]
    fn test_inventory_checks() {
        let item = InventoryItem {
            sku: "A-red".to_string(),
            available_qty: 3,
            on_shelf: true,
        };
        assert!(item.in_stock());
        assert!(item.can_fulfill(3));
        assert!(!item.can_fulfill(4));
    }
}
