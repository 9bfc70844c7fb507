//! # Variation & SKU Resolution
//!
//! Turns a product definition plus a shopper's selection into a canonical
//! SKU and a price.
//!
//! ## Resolution Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Resolution Pipeline                                 │
//! │                                                                         │
//! │  Product (backend data)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  VerifiedProduct::new   ← ingestion checks (ids, options, prices)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Resolver::resolve(product, selection)                                 │
//! │       │                                                                 │
//! │       ├── (a) required group missing?  → IncompleteSelection           │
//! │       ├── (b) value not an option?     → InvalidOption                 │
//! │       ├── (c) SKU = id + values in declared group order                │
//! │       └── (d) price = base + Σ modifiers (half-even to precision)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Resolution { sku, price }  ──► resolve_line_item ──► CartItem         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution holds no state between calls: the same product and selection
//! always produce the same SKU and price.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Precision};
use crate::types::{CartItem, InventoryItem, Product, Selection, VariationGroup};
use crate::validation::{
    validate_option_value, validate_product_id, validate_quantity, validate_sku, MAX_SKU_LEN,
};

// =============================================================================
// Verified Product
// =============================================================================

/// A product definition that passed ingestion checks.
///
/// Only a `VerifiedProduct` can be resolved, so a malformed definition can
/// never produce a SKU.
///
/// ## Checks
/// - Product id is a valid identifier
/// - Base price is not negative
/// - Group ids are unique
/// - Option values are identifiers, unique within their group
/// - Required groups declare at least one option
/// - The longest SKU the product can produce fits in `MAX_SKU_LEN`
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedProduct(Product);

impl VerifiedProduct {
    pub fn new(product: Product) -> CoreResult<Self> {
        let reject = |reason: String| CoreError::InvalidProduct {
            product_id: product.id.clone(),
            reason,
        };

        validate_product_id(&product.id).map_err(|e| reject(e.to_string()))?;

        if product.base_price < Decimal::ZERO {
            return Err(reject("base price must not be negative".to_string()));
        }

        // longest SKU: id plus one separator and the longest value per group
        let mut longest_sku = product.id.chars().count();
        let mut group_ids = HashSet::new();
        for group in &product.variation_groups {
            if group.id.is_empty() {
                return Err(reject("variation group id is empty".to_string()));
            }
            if !group_ids.insert(group.id.as_str()) {
                return Err(reject(format!("duplicate variation group {}", group.id)));
            }
            if group.required && group.options.is_empty() {
                return Err(reject(format!(
                    "required variation group {} has no options",
                    group.id
                )));
            }

            let mut values = HashSet::new();
            let mut longest_value = 0;
            for option in &group.options {
                validate_option_value(&option.value)
                    .map_err(|e| reject(format!("group {}: {}", group.id, e)))?;
                if !values.insert(option.value.as_str()) {
                    return Err(reject(format!(
                        "duplicate option {} in group {}",
                        option.value, group.id
                    )));
                }
                longest_value = longest_value.max(option.value.chars().count());
            }
            if longest_value > 0 {
                longest_sku += 1 + longest_value;
            }
        }

        if longest_sku > MAX_SKU_LEN {
            return Err(reject(format!(
                "SKUs may reach {} characters, limit is {}",
                longest_sku, MAX_SKU_LEN
            )));
        }

        Ok(VerifiedProduct(product))
    }

    /// Returns the underlying definition.
    pub fn product(&self) -> &Product {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn into_inner(self) -> Product {
        self.0
    }
}

impl AsRef<Product> for VerifiedProduct {
    fn as_ref(&self) -> &Product {
        &self.0
    }
}

impl TryFrom<Product> for VerifiedProduct {
    type Error = CoreError;

    fn try_from(product: Product) -> CoreResult<Self> {
        VerifiedProduct::new(product)
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub sku: String,
    /// Base price plus modifiers.
    pub price: Money,
    /// Base price alone, in the same precision.
    pub base_price: Money,
}

/// Resolves selections against verified products.
///
/// Carries only the settings that shape a result (SKU separator, precision,
/// quantity limit); it is cheap to clone and safe to share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    separator: String,
    precision: Precision,
    max_item_quantity: i64,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(&CoreConfig::default())
    }
}

impl Resolver {
    pub fn new(config: &CoreConfig) -> Self {
        Resolver {
            separator: config.sku_separator.clone(),
            precision: config.precision,
            max_item_quantity: config.max_item_quantity,
        }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Computes the SKU and price for a selection.
    ///
    /// ## Errors
    /// - `IncompleteSelection` for the first required group (declared order)
    ///   that has no entry
    /// - `InvalidOption` when a value is not among its group's options, or the
    ///   selection names a group the product does not declare. Declared
    ///   groups are checked first, in declared order.
    /// - `Validation` when the resulting price is negative or overflows
    ///
    /// ## Example
    /// ```rust
    /// use anycommerce_core::resolve::{Resolver, VerifiedProduct};
    /// use anycommerce_core::types::{Product, Selection, VariationGroup, VariationOption};
    /// use rust_decimal::Decimal;
    ///
    /// let product = Product::new("APP4DOG", "Dog Jacket", Decimal::new(9999, 2)).with_group(
    ///     VariationGroup::new("color", "Color")
    ///         .with_option(VariationOption::new("red", "Red"))
    ///         .with_option(VariationOption::new("blue", "Blue").with_modifier(Decimal::new(500, 2))),
    /// );
    /// let product = VerifiedProduct::new(product).unwrap();
    ///
    /// let resolution = Resolver::default()
    ///     .resolve(&product, &Selection::new().with("color", "blue"))
    ///     .unwrap();
    /// assert_eq!(resolution.sku, "APP4DOG-blue");
    /// assert_eq!(resolution.price.minor(), 10499);
    /// ```
    pub fn resolve(
        &self,
        product: &VerifiedProduct,
        selection: &Selection,
    ) -> CoreResult<Resolution> {
        let product = product.product();

        // (a) completeness, in declared order
        if let Some(missing) = product
            .variation_groups
            .iter()
            .find(|g| g.required && selection.get(&g.id).is_none())
        {
            return Err(CoreError::IncompleteSelection {
                missing_group_id: missing.id.clone(),
            });
        }

        // (b) selected values must be options, declared groups first
        for group in &product.variation_groups {
            if let Some(value) = selection.get(&group.id) {
                if group.option(value).is_none() {
                    return Err(CoreError::InvalidOption {
                        group_id: group.id.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }
        if let Some((group_id, value)) = selection
            .iter()
            .find(|(group_id, _)| product.group(group_id).is_none())
        {
            return Err(CoreError::InvalidOption {
                group_id: group_id.to_string(),
                value: value.to_string(),
            });
        }

        // (c) + (d), walking groups in declared order
        let mut sku = product.id.clone();
        let mut amount = product.base_price;
        for group in &product.variation_groups {
            let Some(option) = selection.get(&group.id).and_then(|v| group.option(v)) else {
                continue;
            };
            sku.push_str(&self.separator);
            sku.push_str(&option.value);
            amount = amount
                .checked_add(option.price_modifier)
                .ok_or_else(|| ValidationError::Overflow {
                    field: "price".to_string(),
                })?;
        }

        validate_sku(&sku)?;

        let price = Money::from_decimal(amount, self.precision)?;
        if price.is_negative() {
            return Err(ValidationError::Negative {
                field: "price".to_string(),
            }
            .into());
        }
        let base_price = Money::from_decimal(product.base_price, self.precision)?;

        debug!(product_id = %product.id, sku = %sku, price = price.minor(), "Resolved selection");

        Ok(Resolution {
            sku,
            price,
            base_price,
        })
    }

    /// Resolves a selection into the priced line the cart accepts.
    ///
    /// ## Errors
    /// Everything [`Resolver::resolve`] returns, plus
    /// - `InvalidQuantity` when `quantity` is zero or negative
    /// - `QuantityTooLarge` when it exceeds the configured maximum
    pub fn resolve_line_item(
        &self,
        product: &VerifiedProduct,
        selection: &Selection,
        quantity: i64,
    ) -> CoreResult<CartItem> {
        self.check_quantity(quantity)?;
        let resolution = self.resolve(product, selection)?;

        Ok(CartItem {
            sku: resolution.sku,
            product_id: product.id().to_string(),
            name: product.product().name.clone(),
            quantity,
            unit_base_price: resolution.base_price,
            unit_price: resolution.price,
            variations: selection.clone(),
        })
    }

    fn check_quantity(&self, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity });
        }
        if validate_quantity(quantity, self.max_item_quantity).is_err() {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: self.max_item_quantity,
            });
        }
        Ok(())
    }
}

/// Resolves with the default configuration (`-` separator, two digits).
pub fn resolve(product: &VerifiedProduct, selection: &Selection) -> CoreResult<Resolution> {
    Resolver::default().resolve(product, selection)
}

/// [`Resolver::resolve_line_item`] with the default configuration.
pub fn resolve_line_item(
    product: &VerifiedProduct,
    selection: &Selection,
    quantity: i64,
) -> CoreResult<CartItem> {
    Resolver::default().resolve_line_item(product, selection, quantity)
}

/// Looks up the inventory record for a SKU of this product.
///
/// Read-only; resolution never consults inventory.
pub fn availability<'a>(product: &'a Product, sku: &str) -> CoreResult<&'a InventoryItem> {
    product
        .inventory
        .get(sku)
        .ok_or_else(|| CoreError::InventoryNotFound(sku.to_string()))
}

// =============================================================================
// Catalog
// =============================================================================

/// Verified products keyed by product id.
///
/// The host loads definitions as they arrive from the backend and resolves
/// by product id afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resolver: Resolver,
    products: BTreeMap<String, VerifiedProduct>,
}

impl Catalog {
    pub fn new(config: &CoreConfig) -> Self {
        Catalog {
            resolver: Resolver::new(config),
            products: BTreeMap::new(),
        }
    }

    /// Verifies and stores a product, replacing any previous definition
    /// with the same id.
    pub fn load(&mut self, product: Product) -> CoreResult<()> {
        let product = VerifiedProduct::new(product)?;
        debug!(
            product_id = %product.id(),
            groups = product.product().variation_groups.len(),
            "Loaded product"
        );
        self.products.insert(product.id().to_string(), product);
        Ok(())
    }

    pub fn get(&self, product_id: &str) -> CoreResult<&VerifiedProduct> {
        self.products
            .get(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))
    }

    /// Variation groups of a product, in declared order.
    pub fn variations(&self, product_id: &str) -> CoreResult<&[VariationGroup]> {
        Ok(&self.get(product_id)?.product().variation_groups)
    }

    /// A single product attribute, `None` when the product lacks it.
    pub fn attribute(
        &self,
        product_id: &str,
        name: &str,
    ) -> CoreResult<Option<&serde_json::Value>> {
        Ok(self.get(product_id)?.product().attributes.get(name))
    }

    pub fn resolve(&self, product_id: &str, selection: &Selection) -> CoreResult<Resolution> {
        self.resolver.resolve(self.get(product_id)?, selection)
    }

    pub fn resolve_line_item(
        &self,
        product_id: &str,
        selection: &Selection,
        quantity: i64,
    ) -> CoreResult<CartItem> {
        self.resolver
            .resolve_line_item(self.get(product_id)?, selection, quantity)
    }

    /// Finds the inventory record for a SKU across all loaded products.
    pub fn inventory(&self, sku: &str) -> CoreResult<&InventoryItem> {
        self.products
            .values()
            .find_map(|p| p.product().inventory.get(sku))
            .ok_or_else(|| CoreError::InventoryNotFound(sku.to_string()))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariationOption;
    use proptest::prelude::*;

    fn dog_jacket() -> Product {
        Product::new("APP4DOG", "Dog Jacket", Decimal::new(9999, 2)).with_group(
            VariationGroup::new("color", "Color")
                .with_option(VariationOption::new("red", "Red"))
                .with_option(
                    VariationOption::new("blue", "Blue").with_modifier(Decimal::new(500, 2)),
                ),
        )
    }

    /// Three groups: color (required), size (required), gift wrap (optional).
    fn shirt() -> VerifiedProduct {
        let product = Product::new("SHIRT", "Shirt", Decimal::new(2000, 2))
            .with_group(
                VariationGroup::new("color", "Color")
                    .with_option(VariationOption::new("red", "Red"))
                    .with_option(VariationOption::new("green", "Green"))
                    .with_option(
                        VariationOption::new("gold", "Gold").with_modifier(Decimal::new(250, 2)),
                    ),
            )
            .with_group(
                VariationGroup::new("size", "Size")
                    .with_option(VariationOption::new("S", "Small"))
                    .with_option(VariationOption::new("M", "Medium"))
                    .with_option(
                        VariationOption::new("XL", "Extra Large")
                            .with_modifier(Decimal::new(100, 2)),
                    ),
            )
            .with_group(
                VariationGroup::new("wrap", "Gift wrap")
                    .optional()
                    .with_option(
                        VariationOption::new("yes", "Wrap it").with_modifier(Decimal::new(399, 2)),
                    ),
            );
        VerifiedProduct::new(product).unwrap()
    }

    #[test]
    fn test_resolve_example_product() {
        let product = VerifiedProduct::new(dog_jacket()).unwrap();
        let resolution = resolve(&product, &Selection::new().with("color", "blue")).unwrap();

        assert_eq!(resolution.sku, "APP4DOG-blue");
        assert_eq!(resolution.price, Money::from_minor(10499));
        assert_eq!(resolution.base_price, Money::from_minor(9999));
    }

    #[test]
    fn test_sku_follows_declared_group_order() {
        let selection = Selection::new()
            .with("wrap", "yes")
            .with("size", "XL")
            .with("color", "gold");
        let resolution = resolve(&shirt(), &selection).unwrap();

        assert_eq!(resolution.sku, "SHIRT-gold-XL-yes");
        // 20.00 + 2.50 + 1.00 + 3.99
        assert_eq!(resolution.price, Money::from_minor(2749));
    }

    #[test]
    fn test_optional_group_may_be_omitted() {
        let selection = Selection::new().with("color", "red").with("size", "S");
        let resolution = resolve(&shirt(), &selection).unwrap();
        assert_eq!(resolution.sku, "SHIRT-red-S");
        assert_eq!(resolution.price, Money::from_minor(2000));
    }

    #[test]
    fn test_product_without_groups_resolves_to_its_id() {
        let product =
            VerifiedProduct::new(Product::new("MUG", "Mug", Decimal::new(800, 2))).unwrap();
        let resolution = resolve(&product, &Selection::new()).unwrap();
        assert_eq!(resolution.sku, "MUG");
        assert_eq!(resolution.price, Money::from_minor(800));
    }

    #[test]
    fn test_first_missing_required_group_is_reported() {
        let err = resolve(&shirt(), &Selection::new()).unwrap_err();
        assert_eq!(
            err,
            CoreError::IncompleteSelection {
                missing_group_id: "color".to_string()
            }
        );

        let err = resolve(&shirt(), &Selection::new().with("color", "red")).unwrap_err();
        assert_eq!(
            err,
            CoreError::IncompleteSelection {
                missing_group_id: "size".to_string()
            }
        );
    }

    #[test]
    fn test_missing_group_is_checked_before_invalid_option() {
        let err = resolve(&shirt(), &Selection::new().with("color", "purple")).unwrap_err();
        assert!(matches!(err, CoreError::IncompleteSelection { .. }));
    }

    #[test]
    fn test_invalid_option_is_rejected() {
        let selection = Selection::new().with("color", "purple").with("size", "S");
        let err = resolve(&shirt(), &selection).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidOption {
                group_id: "color".to_string(),
                value: "purple".to_string()
            }
        );
    }

    #[test]
    fn test_undeclared_group_is_invalid_option() {
        let selection = Selection::new()
            .with("color", "red")
            .with("size", "S")
            .with("sleeve", "long");
        let err = resolve(&shirt(), &selection).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { group_id, .. } if group_id == "sleeve"));
    }

    #[test]
    fn test_invalid_option_follows_declared_group_order() {
        // declared size before color; selection keys sort the other way
        let product = Product::new("TEE", "Tee", Decimal::new(1500, 2))
            .with_group(
                VariationGroup::new("size", "Size").with_option(VariationOption::new("M", "Medium")),
            )
            .with_group(
                VariationGroup::new("color", "Color").with_option(VariationOption::new("red", "Red")),
            );
        let product = VerifiedProduct::new(product).unwrap();

        let selection = Selection::new()
            .with("color", "purple")
            .with("size", "XXL")
            .with("aardvark", "yes");
        let err = resolve(&product, &selection).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidOption {
                group_id: "size".to_string(),
                value: "XXL".to_string()
            }
        );

        let selection = Selection::new()
            .with("color", "red")
            .with("size", "M")
            .with("aardvark", "yes");
        let err = resolve(&product, &selection).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { group_id, .. } if group_id == "aardvark"));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let product = Product::new("SALE", "Sale", Decimal::new(100, 2)).with_group(
            VariationGroup::new("promo", "Promo").with_option(
                VariationOption::new("deep", "Deep cut").with_modifier(Decimal::new(-500, 2)),
            ),
        );
        let product = VerifiedProduct::new(product).unwrap();
        let err = resolve(&product, &Selection::new().with("promo", "deep")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_price_rounds_half_even_at_precision() {
        let product = Product::new("BULK", "Bulk", Decimal::new(1005, 3)); // 1.005
        let product = VerifiedProduct::new(product).unwrap();
        let resolution = resolve(&product, &Selection::new()).unwrap();
        assert_eq!(resolution.price, Money::from_minor(100));

        let config = CoreConfig {
            precision: Precision::new(0).unwrap(),
            sku_separator: ":".to_string(),
            ..CoreConfig::default()
        };
        let product = VerifiedProduct::new(dog_jacket()).unwrap();
        let resolution = Resolver::new(&config)
            .resolve(&product, &Selection::new().with("color", "red"))
            .unwrap();
        assert_eq!(resolution.sku, "APP4DOG:red");
        assert_eq!(resolution.price, Money::from_minor(100)); // 99.99 → 100
    }

    #[test]
    fn test_ingestion_rejects_malformed_products() {
        let empty_id = Product::new("", "Nameless", Decimal::ONE);
        assert!(matches!(
            VerifiedProduct::new(empty_id),
            Err(CoreError::InvalidProduct { .. })
        ));

        let negative = Product::new("NEG", "Negative", Decimal::new(-1, 2));
        assert!(VerifiedProduct::new(negative).is_err());

        let duplicate_group = dog_jacket().with_group(
            VariationGroup::new("color", "Again").with_option(VariationOption::new("x", "X")),
        );
        assert!(VerifiedProduct::new(duplicate_group).is_err());

        let duplicate_option = Product::new("DUP", "Dup", Decimal::ONE).with_group(
            VariationGroup::new("size", "Size")
                .with_option(VariationOption::new("S", "Small"))
                .with_option(VariationOption::new("S", "Small again")),
        );
        assert!(VerifiedProduct::new(duplicate_option).is_err());

        let no_options =
            Product::new("BARE", "Bare", Decimal::ONE).with_group(VariationGroup::new("size", "Size"));
        assert!(VerifiedProduct::new(no_options).is_err());

        let optional_no_options = Product::new("BARE", "Bare", Decimal::ONE)
            .with_group(VariationGroup::new("size", "Size").optional());
        assert!(VerifiedProduct::new(optional_no_options).is_ok());
    }

    #[test]
    fn test_ingestion_rejects_values_that_cannot_form_a_sku() {
        let spaced = Product::new("SHIRT", "Shirt", Decimal::ONE).with_group(
            VariationGroup::new("size", "Size")
                .with_option(VariationOption::new("Extra Large", "Extra Large")),
        );
        assert!(matches!(
            VerifiedProduct::new(spaced),
            Err(CoreError::InvalidProduct { product_id, .. }) if product_id == "SHIRT"
        ));

        let slashed = Product::new("SHIRT", "Shirt", Decimal::ONE).with_group(
            VariationGroup::new("size", "Size").with_option(VariationOption::new("S/M", "S/M")),
        );
        assert!(VerifiedProduct::new(slashed).is_err());

        // id plus two groups of 60-character values: 4 + 61 + 61 = 126 > 120
        let long_value = "x".repeat(60);
        let overlong = Product::new("LONG", "Long", Decimal::ONE)
            .with_group(
                VariationGroup::new("a", "A").with_option(VariationOption::new(long_value.clone(), "A")),
            )
            .with_group(
                VariationGroup::new("b", "B").with_option(VariationOption::new(long_value, "B")),
            );
        assert!(matches!(
            VerifiedProduct::new(overlong),
            Err(CoreError::InvalidProduct { .. })
        ));

        // exactly at the limit is fine: 4 + 1 + 115 = 120
        let at_limit = Product::new("LONG", "Long", Decimal::ONE).with_group(
            VariationGroup::new("a", "A").with_option(VariationOption::new("y".repeat(115), "A")),
        );
        let at_limit = VerifiedProduct::new(at_limit).unwrap();
        let selection = Selection::new().with("a", "y".repeat(115));
        assert_eq!(resolve(&at_limit, &selection).unwrap().sku.len(), MAX_SKU_LEN);
    }

    #[test]
    fn test_resolver_with_invalid_separator_fails_instead_of_emitting_bad_sku() {
        let config = CoreConfig {
            sku_separator: " ".to_string(),
            ..CoreConfig::default()
        };
        let product = VerifiedProduct::new(dog_jacket()).unwrap();
        let err = Resolver::new(&config)
            .resolve(&product, &Selection::new().with("color", "red"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_resolve_line_item() {
        let product = VerifiedProduct::new(dog_jacket()).unwrap();
        let selection = Selection::new().with("color", "blue");

        let item = resolve_line_item(&product, &selection, 2).unwrap();
        assert_eq!(item.sku, "APP4DOG-blue");
        assert_eq!(item.product_id, "APP4DOG");
        assert_eq!(item.name, "Dog Jacket");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_base_price, Money::from_minor(9999));
        assert_eq!(item.unit_price, Money::from_minor(10499));
        assert_eq!(item.variations, selection);
        assert_eq!(item.line_total(), Money::from_minor(20998));

        assert_eq!(
            resolve_line_item(&product, &selection, 0).unwrap_err(),
            CoreError::InvalidQuantity { quantity: 0 }
        );
        assert_eq!(
            resolve_line_item(&product, &selection, 1000).unwrap_err(),
            CoreError::QuantityTooLarge {
                requested: 1000,
                max: 999
            }
        );
    }

    #[test]
    fn test_availability() {
        let product = dog_jacket().with_inventory(InventoryItem {
            sku: "APP4DOG-blue".to_string(),
            available_qty: 4,
            on_shelf: true,
        });

        assert_eq!(availability(&product, "APP4DOG-blue").unwrap().available_qty, 4);
        assert_eq!(
            availability(&product, "APP4DOG-red").unwrap_err(),
            CoreError::InventoryNotFound("APP4DOG-red".to_string())
        );
    }

    #[test]
    fn test_catalog_operations() {
        let mut catalog = Catalog::new(&CoreConfig::default());
        assert!(catalog.is_empty());

        let mut product = dog_jacket().with_inventory(InventoryItem {
            sku: "APP4DOG-red".to_string(),
            available_qty: 0,
            on_shelf: false,
        });
        product
            .attributes
            .insert("zoovy:prod_name".to_string(), serde_json::json!("Dog Jacket"));
        catalog.load(product).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.variations("APP4DOG").unwrap().len(), 1);
        assert_eq!(
            catalog.attribute("APP4DOG", "zoovy:prod_name").unwrap(),
            Some(&serde_json::json!("Dog Jacket"))
        );
        assert_eq!(catalog.attribute("APP4DOG", "missing").unwrap(), None);
        assert!(!catalog.inventory("APP4DOG-red").unwrap().in_stock());

        let resolution = catalog
            .resolve("APP4DOG", &Selection::new().with("color", "blue"))
            .unwrap();
        assert_eq!(resolution.sku, "APP4DOG-blue");

        assert_eq!(
            catalog.get("NOPE").unwrap_err(),
            CoreError::ProductNotFound("NOPE".to_string())
        );
        assert!(catalog.load(Product::new("", "Bad", Decimal::ONE)).is_err());
        assert_eq!(catalog.len(), 1);
    }

    // =========================================================================
    // Property Tests
    // =========================================================================

    const COLORS: [&str; 3] = ["red", "green", "gold"];
    const SIZES: [&str; 3] = ["S", "M", "XL"];

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic_and_order_independent(
            color in 0..3usize,
            size in 0..3usize,
            wrap in any::<bool>(),
            order in Just(vec![0usize, 1, 2]).prop_shuffle(),
        ) {
            let product = shirt();
            let entries = [
                ("color", COLORS[color]),
                ("size", SIZES[size]),
                ("wrap", "yes"),
            ];

            let mut forward = Selection::new();
            for (group, value) in entries.iter().take(if wrap { 3 } else { 2 }) {
                forward.insert(*group, *value);
            }

            let mut shuffled = Selection::new();
            for index in order {
                if index == 2 && !wrap {
                    continue;
                }
                let (group, value) = entries[index];
                shuffled.insert(group, value);
            }

            let first = resolve(&product, &forward).unwrap();
            let again = resolve(&product, &forward).unwrap();
            let permuted = resolve(&product, &shuffled).unwrap();

            prop_assert_eq!(&first, &again);
            prop_assert_eq!(&first, &permuted);
            prop_assert!(first.sku.starts_with("SHIRT-"));
            prop_assert!(validate_sku(&first.sku).is_ok());
        }

        #[test]
        fn prop_incomplete_iff_required_group_missing(
            has_color in any::<bool>(),
            has_size in any::<bool>(),
        ) {
            let mut selection = Selection::new();
            if has_color {
                selection.insert("color", "red");
            }
            if has_size {
                selection.insert("size", "M");
            }

            let result = resolve(&shirt(), &selection);
            let incomplete = matches!(result, Err(CoreError::IncompleteSelection { .. }));
            prop_assert_eq!(incomplete, !(has_color && has_size));
            prop_assert_eq!(result.is_ok(), has_color && has_size);
        }
    }
}
