//! Per-user session: owned reactive stores tied to an authenticated identity.
//!
//! `Session::start` opens the expense and category subscriptions for one
//! identity; `Session::end` closes them. Recomputations already spawned keep
//! running after the session ends.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::auth::{AuthError, Identity};
use crate::model::{FromDocument, ModelError, UserStats};
use crate::storage::{Collection, DocumentStore, Query, StorageError};
use crate::sync::{BackgroundTasks, FallbackSubscription, QueryState};

mod account;
mod categories;
mod expenses;


pub use account::{sign_up, SignUp};
pub use categories::{CategoryStore, CategoryWriter};
pub use expenses::ExpenseStore;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors returned to callers of session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid record: {0}")]
    Invalid(#[from] ModelError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Subscription lifecycle of a reactive store. Stores are single-use.
enum Lifecycle {
    Idle,
    Running(FallbackSubscription),
    Stopped,
}

/// Lifecycle slot shared by both stores.
struct LifecycleSlot(Mutex<Lifecycle>);

impl LifecycleSlot {
    fn new() -> Self {
        Self(Mutex::new(Lifecycle::Idle))
    }

    /// Start with `open` if idle. Returns whether it started.
    fn start(&self, open: impl FnOnce() -> FallbackSubscription) -> bool {
        let mut lifecycle = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match *lifecycle {
            Lifecycle::Idle => {
                *lifecycle = Lifecycle::Running(open());
                true
            }
            _ => false,
        }
    }

    /// Stop if running. Returns whether it stopped.
    fn stop(&self) -> bool {
        let mut lifecycle = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(subscription) => {
                subscription.unsubscribe();
                true
            }
            _ => false,
        }
    }

    fn query_state(&self) -> Option<QueryState> {
        match &*self.0.lock().unwrap_or_else(PoisonError::into_inner) {
            Lifecycle::Running(subscription) => Some(subscription.state()),
            _ => None,
        }
    }

    fn is_running(&self) -> bool {
        matches!(
            *self.0.lock().unwrap_or_else(PoisonError::into_inner),
            Lifecycle::Running(_)
        )
    }
}

/// An authenticated user's live session.
pub struct Session {
    identity: Identity,
    store: Arc<dyn DocumentStore>,
    expenses: ExpenseStore,
    categories: CategoryStore,
    tasks: BackgroundTasks,
}

impl Session {
    /// Build both stores for `identity` and start their subscriptions.
    pub fn start(store: Arc<dyn DocumentStore>, identity: Identity) -> Self {
        let tasks = BackgroundTasks::new();
        let expenses = ExpenseStore::new(store.clone(), identity.clone(), tasks.clone());
        let categories = CategoryStore::new(store.clone(), identity.clone(), tasks.clone());
        expenses.start();
        categories.start();
        info!(uid = %identity.uid, "Session started");

        Self {
            identity,
            store,
            expenses,
            categories,
            tasks,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn expenses(&self) -> &ExpenseStore {
        &self.expenses
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// This user's stats record, if one has been written.
    pub async fn own_stats(&self) -> Result<Option<UserStats>> {
        let doc = self
            .store
            .get(Collection::Users, &self.identity.uid)
            .await?;
        Ok(doc.map(|d| UserStats::from_document(&d)).transpose()?)
    }

    /// Stats records of every other user.
    pub async fn friends(&self) -> Result<Vec<UserStats>> {
        let docs = self.store.query(&Query::new(Collection::Users)).await?;
        Ok(docs
            .iter()
            .filter(|d| d.id != self.identity.uid)
            .filter_map(|d| UserStats::from_document(d).ok())
            .collect())
    }

    /// Wait for background work (seeding, recomputation) to finish.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }

    /// Close both subscriptions.
    pub fn end(self) {
        self.expenses.stop();
        self.categories.stop();
        info!(uid = %self.identity.uid, "Session ended");
    }
}
