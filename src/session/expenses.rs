//! Reactive expense store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::{LifecycleSlot, Result};
use crate::auth::Identity;
use crate::model::{Expense, ExpensePatch, ExpenseStatus, ModelError, NewExpense};
use crate::repository::DocumentRepository;
use crate::storage::{Collection, Direction, DocumentStore, Fields, Query};
use crate::sync::{
    subscribe_with_fallback, BackgroundTasks, LiveView, QueryState, StatsRecomputer, ViewState,
};

/// Field stamped with the author's display name on create.
const USER_NAME_FIELD: &str = "userName";

/// One user's expenses: live view plus mutations.
pub struct ExpenseStore {
    repository: DocumentRepository,
    identity: Identity,
    view: Arc<LiveView<Expense>>,
    recomputer: StatsRecomputer,
    lifecycle: LifecycleSlot,
}

impl ExpenseStore {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Identity, tasks: BackgroundTasks) -> Self {
        let repository = DocumentRepository::new(store, identity.uid.clone());
        Self {
            recomputer: StatsRecomputer::new(repository.clone(), tasks),
            repository,
            identity,
            view: Arc::new(LiveView::new("expenses")),
            lifecycle: LifecycleSlot::new(),
        }
    }

    /// Owner's expenses, newest first.
    pub fn preferred_query(owner_id: &str) -> Query {
        Query::new(Collection::Expenses)
            .owned_by(owner_id)
            .order_by("date", Direction::Descending)
    }

    /// Open the live subscription. Does nothing once started or stopped.
    pub fn start(&self) {
        let started = self.lifecycle.start(|| {
            subscribe_with_fallback(
                self.repository.store().clone(),
                Self::preferred_query(self.repository.owner_id()),
                self.view.clone(),
            )
        });
        if started {
            info!(uid = %self.identity.uid, "Expense subscription started");
        }
    }

    /// Close the live subscription.
    pub fn stop(&self) {
        if self.lifecycle.stop() {
            info!(uid = %self.identity.uid, "Expense subscription stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn view(&self) -> watch::Receiver<ViewState<Expense>> {
        self.view.subscribe()
    }

    pub fn current(&self) -> ViewState<Expense> {
        self.view.current()
    }

    pub fn query_state(&self) -> QueryState {
        self.lifecycle
            .query_state()
            .unwrap_or_else(|| self.view.current().query_state)
    }

    /// Create an expense and recompute the owner's totals in the background.
    pub async fn add(&self, expense: NewExpense) -> Result<String> {
        expense.validate()?;
        let fields = Fields::from_serialize(&expense)
            .map_err(ModelError::from)?
            .set(USER_NAME_FIELD, self.identity.label());
        let id = self.repository.create(Collection::Expenses, fields).await?;
        self.recomputer.spawn("expense.add");
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: ExpensePatch) -> Result<()> {
        patch.validate()?;
        let fields = Fields::from_serialize(&patch).map_err(ModelError::from)?;
        self.repository
            .update(Collection::Expenses, id, fields)
            .await?;
        self.recomputer.spawn("expense.update");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repository.delete(Collection::Expenses, id).await?;
        self.recomputer.spawn("expense.delete");
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: ExpenseStatus) -> Result<()> {
        self.update(id, ExpensePatch::status(status)).await
    }

    pub async fn submit(&self, id: &str) -> Result<()> {
        self.set_status(id, ExpenseStatus::Submitted).await
    }

    pub async fn approve(&self, id: &str) -> Result<()> {
        self.set_status(id, ExpenseStatus::Approved).await
    }

    pub async fn reject(&self, id: &str) -> Result<()> {
        self.set_status(id, ExpenseStatus::Rejected).await
    }
}
