//! Degraded-query fallback.
//!
//! A subscription starts on its preferred (filtered and ordered) query. If
//! that query cannot be opened, typically because the backend lacks a
//! composite index, it switches once to the same query without server-side
//! ordering and sorts each snapshot locally. Any further error is terminal.
//!
//! ```text
//! Preferred --open failure--> Fallback --any error--> Failed
//!     |                                                  ^
//!     +---------------stream error-----------------------+
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::subscription::{DeliveryGate, SnapshotSink, Subscription};
use crate::storage::query::sort_documents;
use crate::storage::{DocumentStore, OrderBy, Query, StorageError};

/// Fallback state of a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryState {
    #[default]
    Preferred,
    Fallback,
    Failed,
}

/// How a query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    /// Could not be opened, or failed before its first snapshot.
    Open,
    /// Failed after delivering at least one snapshot.
    Stream,
}

impl QueryState {
    /// State after a failure in this state. Failed is absorbing.
    pub fn on_failure(self, failure: QueryFailure) -> QueryState {
        match (self, failure) {
            (QueryState::Preferred, QueryFailure::Open) => QueryState::Fallback,
            _ => QueryState::Failed,
        }
    }
}

/// Live subscription with fallback, plus its observable state.
pub struct FallbackSubscription {
    subscription: Subscription,
    state: watch::Receiver<QueryState>,
}

impl FallbackSubscription {
    pub fn state(&self) -> QueryState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<QueryState> {
        self.state.clone()
    }

    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

/// Subscribe `sink` to `preferred`, degrading to an unordered query if the
/// preferred one cannot be opened.
pub fn subscribe_with_fallback(
    store: Arc<dyn DocumentStore>,
    preferred: Query,
    sink: Arc<dyn SnapshotSink>,
) -> FallbackSubscription {
    let gate = Arc::new(DeliveryGate::new());
    let (state_tx, state_rx) = watch::channel(QueryState::Preferred);

    let driver = FallbackDriver {
        store,
        preferred,
        sink,
        gate: gate.clone(),
        state: state_tx,
    };
    let task = tokio::spawn(driver.run());

    FallbackSubscription {
        subscription: Subscription::from_task(gate, task),
        state: state_rx,
    }
}

struct FallbackDriver {
    store: Arc<dyn DocumentStore>,
    preferred: Query,
    sink: Arc<dyn SnapshotSink>,
    gate: Arc<DeliveryGate>,
    state: watch::Sender<QueryState>,
}

impl FallbackDriver {
    async fn run(self) {
        let collection = self.preferred.collection;

        let Some((failure, err)) = self.run_phase(self.preferred.clone(), None).await else {
            return;
        };

        match QueryState::Preferred.on_failure(failure) {
            QueryState::Fallback => {
                warn!(
                    %collection,
                    error = %err,
                    "Preferred query unavailable, falling back to unordered query"
                );
                self.transition(QueryState::Fallback);

                let fallback = self.preferred.without_order();
                let order = self.preferred.order_by.clone();
                if let Some((_, err)) = self.run_phase(fallback, order).await {
                    self.fail(err);
                }
            }
            _ => self.fail(err),
        }
    }

    /// Deliver snapshots of `query` until it fails or the gate closes.
    ///
    /// Returns the failure, or `None` if the subscription ended without one.
    async fn run_phase(
        &self,
        query: Query,
        local_order: Option<OrderBy>,
    ) -> Option<(QueryFailure, StorageError)> {
        let mut stream = match self.store.listen(query).await {
            Ok(stream) => stream,
            Err(e) => return Some((QueryFailure::Open, e)),
        };

        let mut delivered = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(mut docs) => {
                    if let Some(order) = &local_order {
                        sort_documents(&mut docs, order);
                    }
                    if !self.gate.deliver(|| self.sink.snapshot(docs)) {
                        return None;
                    }
                    delivered = true;
                }
                Err(e) => {
                    let failure = if delivered {
                        QueryFailure::Stream
                    } else {
                        QueryFailure::Open
                    };
                    return Some((failure, e));
                }
            }
        }

        info!(collection = %self.preferred.collection, "Live query ended");
        None
    }

    fn transition(&self, state: QueryState) {
        self.state.send_replace(state);
        self.gate.deliver(|| self.sink.state_changed(state));
    }

    fn fail(&self, err: StorageError) {
        error!(
            collection = %self.preferred.collection,
            error = %err,
            "Live query failed"
        );
        self.transition(QueryState::Failed);
        self.gate.deliver(|| self.sink.error(&err));
    }
}
