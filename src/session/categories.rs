//! Reactive category store with default-category bootstrap.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use super::{LifecycleSlot, Result};
use crate::auth::Identity;
use crate::model::{Category, CategoryPatch, ModelError, NewCategory};
use crate::repository::DocumentRepository;
use crate::storage::{Collection, Direction, Document, DocumentStore, Fields, Query, StorageError};
use crate::sync::{
    default_categories, subscribe_with_fallback, BackgroundTasks, BootstrapGuard, LiveView,
    QueryState, SnapshotSink, StatsRecomputer, ViewState,
};

/// Category mutations for one owner.
#[derive(Clone)]
pub struct CategoryWriter {
    repository: DocumentRepository,
    recomputer: StatsRecomputer,
}

impl CategoryWriter {
    pub fn new(repository: DocumentRepository, recomputer: StatsRecomputer) -> Self {
        Self {
            repository,
            recomputer,
        }
    }

    pub async fn add(&self, category: NewCategory) -> Result<String> {
        category.validate()?;
        let fields = Fields::from_serialize(&category).map_err(ModelError::from)?;
        let id = self
            .repository
            .create(Collection::Categories, fields)
            .await?;
        self.recomputer.spawn("category.add");
        Ok(id)
    }

    /// Rename or rebudget a category. Expenses referencing the old name
    /// are not touched.
    pub async fn update(&self, id: &str, patch: CategoryPatch) -> Result<()> {
        patch.validate()?;
        let fields = Fields::from_serialize(&patch).map_err(ModelError::from)?;
        self.repository
            .update(Collection::Categories, id, fields)
            .await?;
        self.recomputer.spawn("category.update");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repository.delete(Collection::Categories, id).await?;
        self.recomputer.spawn("category.delete");
        Ok(())
    }

    /// Create the default category set. Each create stands alone; a
    /// failure is logged and the rest still run.
    pub async fn seed_defaults(&self) {
        for category in default_categories() {
            let name = category.name.clone();
            if let Err(e) = self.add(category).await {
                error!(
                    owner = %self.repository.owner_id(),
                    category = %name,
                    error = %e,
                    "Failed to create default category"
                );
            }
        }
    }
}

/// Feeds the category view and seeds defaults on an empty first snapshot.
struct CategorySink {
    view: Arc<LiveView<Category>>,
    guard: BootstrapGuard,
    writer: CategoryWriter,
    tasks: BackgroundTasks,
}

impl SnapshotSink for CategorySink {
    fn snapshot(&self, docs: Vec<Document>) {
        // Seeding is registered before the view stops loading, so a caller
        // that saw the first snapshot can settle on it.
        if self.guard.should_seed(docs.is_empty()) {
            info!(
                owner = %self.writer.repository.owner_id(),
                "No categories found, creating defaults"
            );
            let writer = self.writer.clone();
            self.tasks.spawn(async move { writer.seed_defaults().await });
        }
        self.view.apply_snapshot(&docs);
    }

    fn error(&self, error: &StorageError) {
        self.view.apply_error(error);
    }

    fn state_changed(&self, state: QueryState) {
        self.view.set_query_state(state);
    }
}

/// One user's categories: live view plus mutations.
pub struct CategoryStore {
    writer: CategoryWriter,
    identity: Identity,
    view: Arc<LiveView<Category>>,
    tasks: BackgroundTasks,
    lifecycle: LifecycleSlot,
}

impl CategoryStore {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Identity, tasks: BackgroundTasks) -> Self {
        let repository = DocumentRepository::new(store, identity.uid.clone());
        let recomputer = StatsRecomputer::new(repository.clone(), tasks.clone());
        Self {
            writer: CategoryWriter::new(repository, recomputer),
            identity,
            view: Arc::new(LiveView::new("categories")),
            tasks,
            lifecycle: LifecycleSlot::new(),
        }
    }

    /// Owner's categories by name.
    pub fn preferred_query(owner_id: &str) -> Query {
        Query::new(Collection::Categories)
            .owned_by(owner_id)
            .order_by("name", Direction::Ascending)
    }

    /// Open the live subscription. Does nothing once started or stopped.
    pub fn start(&self) {
        let started = self.lifecycle.start(|| {
            let sink = Arc::new(CategorySink {
                view: self.view.clone(),
                guard: BootstrapGuard::new(),
                writer: self.writer.clone(),
                tasks: self.tasks.clone(),
            });
            subscribe_with_fallback(
                self.writer.repository.store().clone(),
                Self::preferred_query(&self.identity.uid),
                sink,
            )
        });
        if started {
            info!(uid = %self.identity.uid, "Category subscription started");
        }
    }

    pub fn stop(&self) {
        if self.lifecycle.stop() {
            info!(uid = %self.identity.uid, "Category subscription stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn view(&self) -> watch::Receiver<ViewState<Category>> {
        self.view.subscribe()
    }

    pub fn current(&self) -> ViewState<Category> {
        self.view.current()
    }

    pub fn query_state(&self) -> QueryState {
        self.lifecycle
            .query_state()
            .unwrap_or_else(|| self.view.current().query_state)
    }

    pub fn writer(&self) -> &CategoryWriter {
        &self.writer
    }

    pub async fn add(&self, category: NewCategory) -> Result<String> {
        self.writer.add(category).await
    }

    pub async fn update(&self, id: &str, patch: CategoryPatch) -> Result<()> {
        self.writer.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.writer.delete(id).await
    }
}
