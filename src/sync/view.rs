//! Reactive view state.

use tokio::sync::watch;
use tracing::{error, warn};

use super::fallback::QueryState;
use super::subscription::SnapshotSink;
use crate::model::FromDocument;
use crate::storage::{Document, StorageError};

/// Local view of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub records: Vec<T>,
    /// True until the first snapshot or error; never reverts.
    pub loading: bool,
    pub error: Option<String>,
    pub query_state: QueryState,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            error: None,
            query_state: QueryState::Preferred,
        }
    }
}

impl<T> ViewState<T> {
    pub fn is_ready(&self) -> bool {
        !self.loading
    }
}

/// View state fed by a live subscription and published through `watch`.
pub struct LiveView<T> {
    state: watch::Sender<ViewState<T>>,
    label: &'static str,
}

impl<T> LiveView<T>
where
    T: FromDocument + Clone + Send + Sync + 'static,
{
    pub fn new(label: &'static str) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self { state, label }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Replace records with the decoded snapshot.
    pub fn apply_snapshot(&self, docs: &[Document]) {
        let records: Vec<T> = docs
            .iter()
            .filter_map(|doc| match T::from_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(view = self.label, error = %e, "Skipping undecodable document");
                    None
                }
            })
            .collect();

        self.state.send_modify(|state| {
            state.records = records;
            state.loading = false;
            state.error = None;
        });
    }

    /// Clear records and expose a terminal error.
    pub fn apply_error(&self, err: &StorageError) {
        error!(view = self.label, error = %err, "Failed to load view");
        let message = format!("Failed to load {}", self.label);
        self.state.send_modify(|state| {
            state.records.clear();
            state.loading = false;
            state.error = Some(message);
        });
    }

    pub fn set_query_state(&self, query_state: QueryState) {
        self.state.send_modify(|state| state.query_state = query_state);
    }
}

impl<T> SnapshotSink for LiveView<T>
where
    T: FromDocument + Clone + Send + Sync + 'static,
{
    fn snapshot(&self, docs: Vec<Document>) {
        self.apply_snapshot(&docs);
    }

    fn error(&self, error: &StorageError) {
        self.apply_error(error);
    }

    fn state_changed(&self, state: QueryState) {
        self.set_query_state(state);
    }
}
