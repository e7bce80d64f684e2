//! In-memory document store.
//!
//! Serves as the default backend and as the test double: composite-index
//! enforcement can be switched on to exercise degraded queries, and writes,
//! listens and open streams can be made to fail on demand.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::document::merge_fields;
use super::live::{live_snapshots, ChangeEvent, CHANGE_CHANNEL_CAPACITY};
use super::{
    Collection, Document, DocumentFields, DocumentStore, Fields, IndexSpec, Query, Result,
    SnapshotStream, StorageError,
};


struct Inner {
    collections: RwLock<HashMap<Collection, BTreeMap<String, DocumentFields>>>,
    changes: broadcast::Sender<ChangeEvent>,
    require_indexes: bool,
    indexes: RwLock<HashSet<IndexSpec>>,
    fail_on_listen: RwLock<bool>,
    failing_writes: RwLock<HashSet<Collection>>,
}

/// Document store that keeps every collection in memory.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::build(false, HashSet::new())
    }
}

impl MemoryDocumentStore {
    /// Store that serves every query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects filtered+ordered queries lacking a declared index.
    pub fn with_required_indexes(indexes: impl IntoIterator<Item = IndexSpec>) -> Self {
        Self::build(true, indexes.into_iter().collect())
    }

    fn build(require_indexes: bool, indexes: HashSet<IndexSpec>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
                require_indexes,
                indexes: RwLock::new(indexes),
                fail_on_listen: RwLock::new(false),
                failing_writes: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Declare a composite index, making matching queries servable.
    pub async fn add_index(&self, index: IndexSpec) {
        self.inner.indexes.write().await.insert(index);
    }

    /// Make every subsequent `listen` fail to open.
    pub async fn set_fail_on_listen(&self, fail: bool) {
        *self.inner.fail_on_listen.write().await = fail;
    }

    /// Make writes to `collection` fail.
    pub async fn set_fail_on_write(&self, collection: Collection, fail: bool) {
        let mut failing = self.inner.failing_writes.write().await;
        if fail {
            failing.insert(collection);
        } else {
            failing.remove(&collection);
        }
    }

    /// Break every open live query on `collection` with `message`.
    pub fn inject_stream_error(&self, collection: Collection, message: impl Into<String>) {
        let _ = self.inner.changes.send(ChangeEvent::Failed {
            collection,
            message: message.into(),
        });
    }

    /// Number of documents stored in `collection`.
    pub async fn document_count(&self, collection: Collection) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(&collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    async fn check_writable(&self, collection: Collection) -> Result<()> {
        if self.inner.failing_writes.read().await.contains(&collection) {
            return Err(StorageError::Unavailable(format!(
                "writes to '{}' are failing",
                collection
            )));
        }
        Ok(())
    }

    async fn check_index(&self, query: &Query) -> Result<()> {
        if !self.inner.require_indexes {
            return Ok(());
        }
        if let Some(index) = query.required_index() {
            if !self.inner.indexes.read().await.contains(&index) {
                return Err(StorageError::MissingIndex { index });
            }
        }
        Ok(())
    }

    fn notify(&self, collection: Collection) {
        // No receivers just means nobody is listening.
        let _ = self.inner.changes.send(ChangeEvent::Written(collection));
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String> {
        self.check_writable(collection).await?;
        let id = Uuid::new_v4().simple().to_string();
        {
            let mut collections = self.inner.collections.write().await;
            collections
                .entry(collection)
                .or_default()
                .insert(id.clone(), fields.resolve(Utc::now()));
        }
        debug!(%collection, %id, "Document created");
        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Fields) -> Result<()> {
        self.check_writable(collection).await?;
        {
            let mut collections = self.inner.collections.write().await;
            let existing = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StorageError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            merge_fields(existing, patch.resolve(Utc::now()));
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_writable(collection).await?;
        let removed = {
            let mut collections = self.inner.collections.write().await;
            collections
                .get_mut(&collection)
                .and_then(|docs| docs.remove(id))
                .is_some()
        };
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn set_merge(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        self.check_writable(collection).await?;
        {
            let mut collections = self.inner.collections.write().await;
            let existing = collections
                .entry(collection)
                .or_default()
                .entry(id.to_string())
                .or_default();
            merge_fields(existing, fields.resolve(Utc::now()));
        }
        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.check_index(query).await?;
        let collections = self.inner.collections.read().await;
        let docs = collections
            .get(&query.collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()));
        Ok(query.apply(docs))
    }

    async fn listen(&self, query: Query) -> Result<SnapshotStream> {
        if *self.inner.fail_on_listen.read().await {
            return Err(StorageError::Unavailable(
                "live queries are unavailable".to_string(),
            ));
        }
        self.check_index(&query).await?;
        let changes = self.inner.changes.subscribe();
        Ok(live_snapshots(self.clone(), query, changes))
    }
}
