//! # Dispatch Configuration
//!
//! ## Configuration File Format
//! ```toml
//! # how a host might store it
//! endpoint = "/jsonapi/"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};

fn default_endpoint() -> String {
    "/jsonapi/".to_string()
}

/// Settings for a [`crate::queue::DispatchQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Backend endpoint the host posts drained batches to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            endpoint: default_endpoint(),
        }
    }
}

impl DispatchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        DispatchConfig {
            endpoint: endpoint.into(),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DispatchResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(DispatchError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }

        Ok(())
    }
}
