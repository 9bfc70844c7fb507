//! # Validation Module
//!
//! Input validation utilities shared by the engines.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Host UI                                                      │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate shopper feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identifiers, quantities, coupon codes, prices                     │
//! │  └── Called by resolve / cart before any state changes                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                      │
//! │  └── Authoritative stock, coupon and checkout checks                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use anycommerce_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("APP4DOG-blue").unwrap();
//! validate_quantity(5, 999).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted SKU.
pub const MAX_SKU_LEN: usize = 120;

/// Longest accepted coupon code.
pub const MAX_COUPON_LEN: usize = 40;

/// Characters allowed as the SKU separator.
pub const SKU_SEPARATORS: [char; 4] = ['-', '_', ':', '.'];

// =============================================================================
// String Validators
// =============================================================================

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_SKU_LEN`] characters
/// - Letters, digits, `-`, `_`, `:` and `.` only
///
/// ## Example
/// ```rust
/// use anycommerce_core::validation::validate_sku;
///
/// assert!(validate_sku("APP4DOG-blue").is_ok());
/// assert!(validate_sku("TEST:0001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_identifier("sku", sku, MAX_SKU_LEN)
}

/// Validates a product id. Same rules as a SKU.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    validate_identifier("product id", id, MAX_SKU_LEN)
}

/// Validates a variation option value, which becomes a SKU segment.
///
/// ## Example
/// ```rust
/// use anycommerce_core::validation::validate_option_value;
///
/// assert!(validate_option_value("XL").is_ok());
/// assert!(validate_option_value("Extra Large").is_err());
/// ```
pub fn validate_option_value(value: &str) -> ValidationResult<()> {
    validate_identifier("option value", value, MAX_SKU_LEN)
}

/// Validates the SKU separator: exactly one of [`SKU_SEPARATORS`].
pub fn validate_sku_separator(separator: &str) -> ValidationResult<()> {
    let mut chars = separator.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(ValidationError::Required {
            field: "sku_separator".to_string(),
        }),
        (Some(c), None) if SKU_SEPARATORS.contains(&c) => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "sku_separator".to_string(),
            reason: "must be one of '-', '_', ':' or '.'".to_string(),
        }),
    }
}

fn validate_identifier(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if !value.chars().all(is_identifier_char) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, '-', '_', ':' and '.'".to_string(),
        });
    }

    Ok(())
}

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must not be empty, at most [`MAX_COUPON_LEN`] characters
/// - Letters, digits, `-` and `_` only
///
/// ## Returns
/// The code trimmed and upper-cased, so `" save10 "` and `"SAVE10"` are the
/// same coupon.
pub fn normalize_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.chars().count() > MAX_COUPON_LEN {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: MAX_COUPON_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max`
///
/// ## Cart Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Shopper enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5, max) ← THIS FUNCTION                             │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → Error: "quantity must be between 1 and max"     │
/// │       ├── qty > max? → Error: same, caller maps to QuantityTooLarge    │
/// │       └── OK → proceed with the cart operation                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 || qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free items).
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in a cart.
pub fn validate_cart_size(current_items: usize, max: usize) -> ValidationResult<()> {
    if current_items >= max {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: max as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("APP4DOG-blue").is_ok());
        assert!(validate_sku("TEST:0001").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(MAX_SKU_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_option_value() {
        assert!(validate_option_value("00").is_ok());
        assert!(validate_option_value("XL").is_ok());

        assert!(validate_option_value("").is_err());
        assert!(validate_option_value("Extra Large").is_err());
        assert!(validate_option_value("a/b").is_err());
    }

    #[test]
    fn test_validate_sku_separator() {
        for sep in ["-", "_", ":", "."] {
            assert!(validate_sku_separator(sep).is_ok());
        }
        assert!(matches!(
            validate_sku_separator(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_sku_separator(" ").is_err());
        assert!(validate_sku_separator("--").is_err());
        assert!(validate_sku_separator("/").is_err());
    }

    #[test]
    fn test_normalize_coupon_code() {
        assert_eq!(normalize_coupon_code(" save10 ").unwrap(), "SAVE10");
        assert_eq!(normalize_coupon_code("FREE_SHIP").unwrap(), "FREE_SHIP");

        assert!(normalize_coupon_code("").is_err());
        assert!(normalize_coupon_code("no spaces").is_err());
        assert!(normalize_coupon_code(&"X".repeat(MAX_COUPON_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1, 999).is_ok());
        assert!(validate_quantity(999, 999).is_ok());

        assert!(validate_quantity(0, 999).is_err());
        assert!(validate_quantity(-1, 999).is_err());
        assert!(validate_quantity(1000, 999).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("price", Money::zero()).is_ok());
        assert!(validate_price("price", Money::from_minor(1099)).is_ok());
        assert!(validate_price("price", Money::from_minor(-1)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0, 100).is_ok());
        assert!(validate_cart_size(99, 100).is_ok());
        assert!(validate_cart_size(100, 100).is_err());
    }
}
