//! # Core Configuration
//!
//! Settings the host supplies when it constructs the engines.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Owns What                                        │
//! │                                                                         │
//! │  Host (out of repo)                                                    │
//! │  • reads files / env / remote settings in whatever format it likes     │
//! │  • deserializes into CoreConfig (serde)                                │
//! │                                                                         │
//! │  anycommerce-core (this module)                                        │
//! │  • Default values                                                      │
//! │  • validate() before the engines are built                             │
//! │                                                                         │
//! │  Injected objects (not data, see crate::pricing)                       │
//! │  • CouponPolicy, ShippingCalculator, TaxCalculator                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example (TOML, as a host might store it)
//! ```toml
//! currency = "USD"
//! precision = 2
//! sku_separator = "-"
//! max_cart_items = 100
//! max_item_quantity = 999
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Precision;
use crate::validation::validate_sku_separator;

// =============================================================================
// Defaults
// =============================================================================

fn default_currency() -> String {
    "USD".to_string()
}

fn default_sku_separator() -> String {
    "-".to_string()
}

/// Maximum distinct lines in a single cart.
fn default_max_cart_items() -> usize {
    100
}

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
fn default_max_item_quantity() -> i64 {
    999
}

// =============================================================================
// Core Config
// =============================================================================

/// Configuration shared by the resolution and cart engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// ISO currency code. Informational; amounts carry no currency.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Minor-unit digits used when converting decimal prices to Money.
    #[serde(default)]
    pub precision: Precision,

    /// Placed between the product id and each option value in a SKU.
    /// One of `-`, `_`, `:` or `.`.
    #[serde(default = "default_sku_separator")]
    pub sku_separator: String,

    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            currency: default_currency(),
            precision: Precision::default(),
            sku_separator: default_sku_separator(),
            max_cart_items: default_max_cart_items(),
            max_item_quantity: default_max_item_quantity(),
        }
    }
}

impl CoreConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.currency.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "currency".to_string(),
            }
            .into());
        }

        validate_sku_separator(&self.sku_separator)?;

        if self.max_cart_items == 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_cart_items".to_string(),
                min: 1,
                max: i64::MAX,
            }
            .into());
        }

        if self.max_item_quantity <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_item_quantity".to_string(),
                min: 1,
                max: i64::MAX,
            }
            .into());
        }

        Ok(())
    }
}
