//! # Dispatch Error Types
//!
//! Error types for queue and envelope operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Dispatch Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Queue       │  │     Envelope            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  OperationNot-  │  │  UnknownCommand         │ │
//! │  │                 │  │   Permitted     │  │  MalformedRequest       │ │
//! │  │                 │  │  ImmutableIn-   │  │  MalformedResponse      │ │
//! │  │                 │  │   Flight        │  │  Validation             │ │
//! │  │                 │  │  UnknownBatch   │  │  Serialization          │ │
//! │  │                 │  │  GateClosed     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anycommerce_core::ValidationError;
use thiserror::Error;

use crate::protocol::{BatchId, QueueClass};

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Dispatch error type.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Queue state is never changed by an operation that returns an error
#[derive(Debug, Error)]
pub enum DispatchError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid dispatch configuration.
    #[error("Invalid dispatch configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Queue Errors
    // =========================================================================
    /// The operation is not allowed on this queue class (abort on
    /// immutable or passive).
    #[error("Operation not permitted on the {class} queue")]
    OperationNotPermitted { class: QueueClass },

    /// An immutable batch is drained and not yet acknowledged.
    #[error("Immutable batch {batch_id} is still in flight")]
    ImmutableInFlight { batch_id: BatchId },

    /// Batch id was never issued or was already acknowledged.
    #[error("Unknown batch: {batch_id}")]
    UnknownBatch { batch_id: BatchId },

    /// The immutable gate semaphore was closed.
    #[error("Immutable gate closed")]
    GateClosed,

    // =========================================================================
    // Envelope Errors
    // =========================================================================
    /// `_cmd` names a command this crate does not know.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// Request object is missing `_cmd` or is not an object.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Backend response has neither a result array nor a results object.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A command field failed validation (SKU, quantity, ...).
    #[error("Invalid command payload: {0}")]
    Validation(#[from] ValidationError),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    /// Machine-readable code for host-side error presentation.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidConfig(_) => "INVALID_CONFIG",
            DispatchError::OperationNotPermitted { .. } => "OPERATION_NOT_PERMITTED",
            DispatchError::ImmutableInFlight { .. } => "IMMUTABLE_IN_FLIGHT",
            DispatchError::UnknownBatch { .. } => "UNKNOWN_BATCH",
            DispatchError::GateClosed => "GATE_CLOSED",
            DispatchError::UnknownCommand { .. } => "UNKNOWN_COMMAND",
            DispatchError::MalformedRequest(_) => "MALFORMED_REQUEST",
            DispatchError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            DispatchError::Validation(_) => "VALIDATION_ERROR",
            DispatchError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DispatchError::OperationNotPermitted {
            class: QueueClass::Immutable,
        };
        assert_eq!(err.to_string(), "Operation not permitted on the immutable queue");
        assert_eq!(err.code(), "OPERATION_NOT_PERMITTED");

        let err = DispatchError::UnknownCommand {
            name: "appTeleport".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown command: appTeleport");
    }

    #[test]
    fn test_json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DispatchError = json_err.into();
        assert!(matches!(err, DispatchError::Serialization(_)));
    }
}
