//! Live query subscriptions.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use super::fallback::QueryState;
use crate::storage::{Document, DocumentStore, Query, StorageError};

/// Receiver of live query results.
///
/// Calls are made from a background task and must not block or
/// unsubscribe their own subscription.
pub trait SnapshotSink: Send + Sync + 'static {
    /// Full current result set, replacing any earlier one.
    fn snapshot(&self, docs: Vec<Document>);

    /// The subscription failed and will deliver nothing further.
    fn error(&self, error: &StorageError);

    /// The fallback state machine moved to `state`.
    fn state_changed(&self, _state: QueryState) {}
}

/// Serializes sink calls against unsubscription.
///
/// Once `close` returns, no delivery is in progress and none will start.
pub(crate) struct DeliveryGate {
    open: Mutex<bool>,
}

impl DeliveryGate {
    pub(crate) fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    /// Run `deliver` if the gate is open. Returns whether it ran.
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open {
            deliver();
        }
        *open
    }

    /// Close the gate. Returns true if it was open.
    pub(crate) fn close(&self) -> bool {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *open, false)
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle for a running live query.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    gate: Arc<DeliveryGate>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn from_task(gate: Arc<DeliveryGate>, task: JoinHandle<()>) -> Self {
        Self { gate, task }
    }

    /// Stop deliveries. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if self.gate.close() {
            self.task.abort();
            debug!("Subscription closed");
        }
    }

    /// Whether the subscription may still deliver.
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Subscribe `sink` to `query`.
///
/// Any error, at open or mid-stream, is reported to `sink.error` exactly
/// once and ends the subscription.
pub fn subscribe(
    store: Arc<dyn DocumentStore>,
    query: Query,
    sink: Arc<dyn SnapshotSink>,
) -> Subscription {
    let gate = Arc::new(DeliveryGate::new());
    let task_gate = gate.clone();
    let collection = query.collection;

    let task = tokio::spawn(async move {
        let mut stream = match store.listen(query).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(%collection, error = %e, "Live query failed to open");
                task_gate.deliver(|| sink.error(&e));
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(docs) => {
                    if !task_gate.deliver(|| sink.snapshot(docs)) {
                        return;
                    }
                }
                Err(e) => {
                    debug!(%collection, error = %e, "Live query failed");
                    task_gate.deliver(|| sink.error(&e));
                    return;
                }
            }
        }
    });

    Subscription::from_task(gate, task)
}
