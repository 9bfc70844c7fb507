//! # anycommerce-dispatch: Backend Request Queues
//!
//! Buffers storefront backend commands in three consistency classes and
//! hands them to the host as batches. The host owns the transport; this
//! crate decides what goes out together and in which order.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AnyCommerce Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host (UI + transport)                        │   │
//! │  └───────┬──────────────────────────────────────────▲──────────────┘   │
//! │          │ enqueue(class, request)                   │ Batch / to_wire │
//! │  ┌───────▼──────────────────────────────────────────┴──────────────┐   │
//! │  │          ★ anycommerce-dispatch (THIS CRATE) ★                   │   │
//! │  │                                                                  │   │
//! │  │   ┌──────────┐    ┌────────────┐    ┌──────────┐                │   │
//! │  │   │ mutable  │    │ immutable  │    │ passive  │                │   │
//! │  │   │supersede │    │ one batch  │    │  FIFO    │                │   │
//! │  │   │ by tag   │    │ in flight  │    │          │                │   │
//! │  │   └──────────┘    └────────────┘    └──────────┘                │   │
//! │  │                                                                  │   │
//! │  │   protocol: Command, Request, Batch, BatchResponse               │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                              │ validates ids via                        │
//! │                      ┌───────▼────────┐                                 │
//! │                      │anycommerce-core│                                 │
//! │                      └────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`queue`] - The three queues and the immutable gate
//! - [`protocol`] - Commands, request envelopes, batches and responses
//! - [`config`] - Endpoint settings
//! - [`error`] - Dispatch error types
//!
//! ## Example Usage
//!
//! ```rust
//! use anycommerce_dispatch::{Command, DispatchQueue, QueueClass, Request, RequestTag};
//!
//! let queue = DispatchQueue::default();
//! let request = Request::new(Command::AppProductGet { pid: "APP4DOG".into() })
//!     .with_tag(RequestTag::new("appProductGet|APP4DOG"));
//! queue.enqueue(QueueClass::Mutable, request);
//!
//! let batch = queue.try_drain_batch(QueueClass::Mutable).unwrap();
//! assert_eq!(batch.len(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod protocol;
pub mod queue;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::DispatchConfig;
pub use error::{DispatchError, DispatchResult};
pub use protocol::{
    Batch, BatchEntry, BatchId, BatchResponse, Command, CommandResult, QueueClass, Request,
    RequestHandle, RequestTag, ResponseMessage,
};
pub use queue::DispatchQueue;
