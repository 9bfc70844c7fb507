//! # Error Types
//!
//! Domain-specific error types for anycommerce-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  anycommerce-core errors (this file)                                   │
//! │  ├── CoreError        - Resolution and cart failures                   │
//! │  └── ValidationError  - Input / definition validation failures         │
//! │                                                                         │
//! │  anycommerce-dispatch errors (separate crate)                          │
//! │  └── DispatchError    - Queue and envelope failures                    │
//! │                                                                         │
//! │  Host (out of repo)                                                    │
//! │  └── presents CoreError::code() + message to the shopper               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → Host                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, group id, cart id)
//! 3. Errors are enum variants, never String
//! 4. Every failure is returned as a value; state is never left half-mutated

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations detected by the
/// resolution engine or the cart state engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A required variation group has no entry in the selection.
    ///
    /// ## User Workflow
    /// ```text
    /// Product page: Color [red|blue]  Size [S|M|L]
    ///      │
    ///      ▼
    /// Shopper picks color=blue, forgets size
    ///      │
    ///      ▼
    /// IncompleteSelection { missing_group_id: "size" }
    ///      │
    ///      ▼
    /// UI highlights the Size picker
    /// ```
    #[error("Selection is missing a value for variation group {missing_group_id}")]
    IncompleteSelection { missing_group_id: String },

    /// A selected value is not one of the group's declared options.
    #[error("Option '{value}' is not valid for variation group {group_id}")]
    InvalidOption { group_id: String, value: String },

    /// Quantity is negative (or otherwise unusable for the operation).
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The coupon policy refused the code. Cart state is unchanged.
    #[error("Coupon {code} rejected: {reason}")]
    CouponRejected { code: String, reason: String },

    /// Cart id is not known to the engine.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// SKU is not a line of the cart.
    #[error("Item {sku} not found in cart {cart_id}")]
    ItemNotFound { cart_id: String, sku: String },

    /// Product id is not loaded in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No inventory record exists for the SKU.
    #[error("Inventory not found for SKU {0}")]
    InventoryNotFound(String),

    /// A product definition was rejected at ingestion.
    #[error("Invalid product {product_id}: {reason}")]
    InvalidProduct { product_id: String, reason: String },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Machine-readable code for host-side error presentation.
    ///
    /// ## Usage in the Host
    /// ```typescript
    /// switch (err.code) {
    ///   case 'INCOMPLETE_SELECTION': highlightPicker(err.message); break;
    ///   case 'COUPON_REJECTED':      showCouponError(err.message); break;
    /// }
    /// ```
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::IncompleteSelection { .. } => "INCOMPLETE_SELECTION",
            CoreError::InvalidOption { .. } => "INVALID_OPTION",
            CoreError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            CoreError::CouponRejected { .. } => "COUPON_REJECTED",
            CoreError::CartNotFound(_) => "CART_NOT_FOUND",
            CoreError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CoreError::InventoryNotFound(_) => "INVENTORY_NOT_FOUND",
            CoreError::InvalidProduct { .. } => "INVALID_PRODUCT",
            CoreError::CartTooLarge { .. } => "CART_TOO_LARGE",
            CoreError::QuantityTooLarge { .. } => "QUANTITY_TOO_LARGE",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., illegal characters in a SKU).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Amount does not fit the money representation.
    #[error("{field} is too large to represent")]
    Overflow { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
