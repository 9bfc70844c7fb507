//! # Dispatch Queue
//!
//! Holds outbound requests per consistency class until the host drains them
//! into batches.
//!
//! ## Queue Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Dispatch Queue Flow                                  │
//! │                                                                         │
//! │  enqueue(class, request)                                               │
//! │       │                                                                 │
//! │       ├── Mutable:   drop pending requests with the same datapointer,  │
//! │       │              then append                                       │
//! │       ├── Immutable: append                                            │
//! │       └── Passive:   append                                            │
//! │                                                                         │
//! │  drain_batch(class)                                                    │
//! │       │                                                                 │
//! │       ├── Mutable / Passive: take everything, arrival order            │
//! │       └── Immutable:                                                   │
//! │              1. wait for the gate (one permit)                         │
//! │              2. take everything, arrival order                         │
//! │              3. empty  → release the gate                              │
//! │                 else   → batch is IN FLIGHT, gate held                 │
//! │                                                                         │
//! │  acknowledge(batch_id) ──► in-flight record dropped ──► gate released  │
//! │                                                                         │
//! │  abort(class)                                                          │
//! │       ├── Mutable:             clear, return count                     │
//! │       └── Immutable / Passive: OperationNotPermitted                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queue state sits behind a std mutex that is never held across an
//! await; only the immutable gate (a tokio semaphore) is awaited.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info};

use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::protocol::{Batch, BatchEntry, BatchId, QueueClass, Request, RequestHandle};

// =============================================================================
// Internal State
// =============================================================================

/// The drained immutable batch awaiting acknowledgement.
///
/// Owning the permit is what keeps the gate closed.
#[derive(Debug)]
struct InFlight {
    id: BatchId,
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Default)]
struct QueueState {
    mutable: VecDeque<BatchEntry>,
    immutable: VecDeque<BatchEntry>,
    passive: VecDeque<BatchEntry>,
    next_handle: u64,
    next_batch: u64,
    in_flight: Option<InFlight>,
}

impl QueueState {
    fn queue(&self, class: QueueClass) -> &VecDeque<BatchEntry> {
        match class {
            QueueClass::Mutable => &self.mutable,
            QueueClass::Immutable => &self.immutable,
            QueueClass::Passive => &self.passive,
        }
    }

    fn queue_mut(&mut self, class: QueueClass) -> &mut VecDeque<BatchEntry> {
        match class {
            QueueClass::Mutable => &mut self.mutable,
            QueueClass::Immutable => &mut self.immutable,
            QueueClass::Passive => &mut self.passive,
        }
    }

    fn take_batch(&mut self, class: QueueClass) -> Batch {
        let id = BatchId::new(class, self.next_batch);
        self.next_batch += 1;
        let entries: Vec<BatchEntry> = self.queue_mut(class).drain(..).collect();
        Batch::new(id, entries)
    }
}

// =============================================================================
// Dispatch Queue
// =============================================================================

/// Per-class request queues with the immutable in-flight gate.
///
/// Share it across tasks with `Arc<DispatchQueue>`; every method takes
/// `&self`.
#[derive(Debug)]
pub struct DispatchQueue {
    endpoint: String,
    state: Mutex<QueueState>,
    gate: Arc<Semaphore>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        DispatchQueue::with_endpoint(DispatchConfig::default().endpoint)
    }
}

impl DispatchQueue {
    /// Creates a queue from validated configuration.
    pub fn new(config: DispatchConfig) -> DispatchResult<Self> {
        config.validate()?;
        Ok(DispatchQueue::with_endpoint(config.endpoint))
    }

    fn with_endpoint(endpoint: String) -> Self {
        DispatchQueue {
            endpoint,
            state: Mutex::new(QueueState::default()),
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Endpoint the host posts drained batches to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Enqueue
    // =========================================================================

    /// Appends a request to a queue.
    ///
    /// A mutable request with a data pointer supersedes every pending
    /// mutable request with the same pointer.
    pub fn enqueue(&self, class: QueueClass, request: Request) -> RequestHandle {
        let mut state = self.state();

        let handle = RequestHandle::new(state.next_handle);
        state.next_handle += 1;

        if class == QueueClass::Mutable {
            if let Some(pointer) = request.data_pointer() {
                let before = state.mutable.len();
                state
                    .mutable
                    .retain(|e| e.request.data_pointer() != Some(pointer));
                let superseded = before - state.mutable.len();
                if superseded > 0 {
                    debug!(
                        datapointer = %pointer,
                        superseded,
                        handle = %handle,
                        "Superseded pending mutable requests"
                    );
                }
            }
        }

        debug!(
            class = %class,
            handle = %handle,
            command = request.command_name(),
            "Enqueued request"
        );
        state.queue_mut(class).push_back(BatchEntry { handle, request });
        handle
    }

    /// Enqueues in the command's default class.
    pub fn enqueue_default(&self, request: Request) -> RequestHandle {
        let class = request.command.default_class();
        self.enqueue(class, request)
    }

    /// Parses a request object from the host and enqueues it.
    ///
    /// ## Errors
    /// Everything [`Request::from_value`] returns; nothing is enqueued on
    /// error.
    pub fn enqueue_value(&self, class: QueueClass, value: Value) -> DispatchResult<RequestHandle> {
        let request = Request::from_value(value)?;
        Ok(self.enqueue(class, request))
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Removes and returns everything queued for `class`.
    ///
    /// For `Immutable` this waits while a previous non-empty batch is
    /// unacknowledged.
    pub async fn drain_batch(&self, class: QueueClass) -> DispatchResult<Batch> {
        if class != QueueClass::Immutable {
            return Ok(self.drain_ungated(class));
        }

        let permit = Arc::clone(&self.gate)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::GateClosed)?;
        Ok(self.drain_immutable(permit))
    }

    /// Like [`DispatchQueue::drain_batch`] but never waits.
    ///
    /// ## Errors
    /// `ImmutableInFlight` when an immutable batch is unacknowledged.
    pub fn try_drain_batch(&self, class: QueueClass) -> DispatchResult<Batch> {
        if class != QueueClass::Immutable {
            return Ok(self.drain_ungated(class));
        }

        match Arc::clone(&self.gate).try_acquire_owned() {
            Ok(permit) => Ok(self.drain_immutable(permit)),
            Err(TryAcquireError::Closed) => Err(DispatchError::GateClosed),
            Err(TryAcquireError::NoPermits) => match self.in_flight() {
                Some(batch_id) => Err(DispatchError::ImmutableInFlight { batch_id }),
                // A concurrent drain holds the permit but has not recorded
                // its batch yet.
                None => Err(DispatchError::ImmutableInFlight {
                    batch_id: BatchId::new(QueueClass::Immutable, self.state().next_batch),
                }),
            },
        }
    }

    fn drain_ungated(&self, class: QueueClass) -> Batch {
        let batch = self.state().take_batch(class);
        if !batch.is_empty() {
            debug!(class = %class, batch_id = %batch.id(), size = batch.len(), "Drained batch");
        }
        batch
    }

    fn drain_immutable(&self, permit: OwnedSemaphorePermit) -> Batch {
        let mut state = self.state();
        let batch = state.take_batch(QueueClass::Immutable);

        if batch.is_empty() {
            drop(permit);
        } else {
            info!(batch_id = %batch.id(), size = batch.len(), "Immutable batch in flight");
            state.in_flight = Some(InFlight {
                id: batch.id(),
                _permit: permit,
            });
        }
        batch
    }

    // =========================================================================
    // Abort / Acknowledge
    // =========================================================================

    /// Discards pending mutable requests and returns how many were dropped.
    ///
    /// ## Errors
    /// `OperationNotPermitted` for `Immutable` and `Passive`; nothing is
    /// discarded.
    pub fn abort(&self, class: QueueClass) -> DispatchResult<usize> {
        if class != QueueClass::Mutable {
            return Err(DispatchError::OperationNotPermitted { class });
        }

        let mut state = self.state();
        let count = state.mutable.len();
        state.mutable.clear();

        if count > 0 {
            debug!(count, "Aborted mutable requests");
        }
        Ok(count)
    }

    /// Marks a drained batch as delivered.
    ///
    /// Releases the immutable gate when `batch_id` is the in-flight batch.
    /// Mutable and passive batches are never gated, so acknowledging one is
    /// a no-op.
    ///
    /// ## Errors
    /// `UnknownBatch` when the id was never issued, or names an immutable
    /// batch that is not in flight (already acknowledged, or empty).
    pub fn acknowledge(&self, batch_id: BatchId) -> DispatchResult<()> {
        let mut state = self.state();

        if batch_id.class() != QueueClass::Immutable {
            if batch_id.seq() < state.next_batch {
                return Ok(());
            }
            return Err(DispatchError::UnknownBatch { batch_id });
        }

        match state.in_flight.as_ref() {
            Some(in_flight) if in_flight.id == batch_id => {
                state.in_flight = None;
                info!(batch_id = %batch_id, "Immutable batch acknowledged");
                Ok(())
            }
            _ => Err(DispatchError::UnknownBatch { batch_id }),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of pending requests in a queue.
    pub fn len(&self, class: QueueClass) -> usize {
        self.state().queue(class).len()
    }

    /// Whether any queue has pending requests.
    pub fn has_pending(&self) -> bool {
        let state = self.state();
        QueueClass::ALL
            .iter()
            .any(|&class| !state.queue(class).is_empty())
    }

    /// Id of the unacknowledged immutable batch, if any.
    pub fn in_flight(&self) -> Option<BatchId> {
        self.state().in_flight.as_ref().map(|f| f.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
