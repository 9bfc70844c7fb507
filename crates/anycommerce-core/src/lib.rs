//! # anycommerce-core: Storefront Compute Core
//!
//! Product-variation resolution and cart state for an embeddable storefront.
//! Everything here is pure computation over owned data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AnyCommerce Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host (UI + transport)                        │   │
//! │  │    Product page ──► Cart view ──► Checkout                     │   │
//! │  └──────────────┬──────────────────────────────────┬──────────────┘   │
//! │                 │                                  │                   │
//! │  ┌──────────────▼──────────────────────────┐  ┌────▼──────────────┐   │
//! │  │      ★ anycommerce-core (THIS CRATE) ★   │  │ anycommerce-      │   │
//! │  │                                          │  │ dispatch          │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ │  │                   │   │
//! │  │  │ resolve  │ │  engine  │ │ pricing  │ │  │ DispatchQueue     │   │
//! │  │  │ Catalog  │ │CartEngine│ │ coupons  │ │  │ Request / Batch   │   │
//! │  │  │ Resolver │ │   Cart   │ │ ship/tax │ │  │                   │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ │  └───────────────────┘   │
//! │  │                                          │                          │
//! │  │  NO I/O • NO NETWORK • INTEGER MONEY     │                          │
//! │  └──────────────────────────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, variation, inventory and cart line types
//! - [`money`] - Money in integer minor units, decimal conversion
//! - [`resolve`] - Selection → SKU + price, product catalog
//! - [`pricing`] - Coupon, shipping and tax policies, summary recomputation
//! - [`cart`] - The cart entity
//! - [`engine`] - Cart registry with per-cart atomic mutations
//! - [`config`] - Host-supplied settings
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same product and selection, same SKU and price
//! 2. **No I/O**: the host owns transport, storage and presentation
//! 3. **Integer Money**: decimals become minor units once, at resolution
//! 4. **Explicit Errors**: every failure is a typed value
//!
//! ## Example Usage
//!
//! ```rust
//! use anycommerce_core::money::{Money, Precision};
//! use rust_decimal::Decimal;
//!
//! // 104.995 rounds half-to-even to 105.00
//! let price = Money::from_decimal(Decimal::new(104995, 3), Precision::cents()).unwrap();
//! assert_eq!(price.minor(), 10500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod engine;
pub mod error;
pub mod money;
pub mod pricing;
pub mod resolve;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartStatus};
pub use config::CoreConfig;
pub use engine::{CartEngine, CartEngineBuilder};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Precision};
pub use pricing::{CartRules, CouponPolicy, ShippingCalculator, TaxCalculator};
pub use resolve::{availability, resolve, resolve_line_item, Catalog, Resolution, Resolver, VerifiedProduct};
pub use types::*;
