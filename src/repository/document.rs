//! Document repository.
//!
//! Wraps a document store for one authenticated owner, stamping ownership
//! and server timestamps on every write.

use std::sync::Arc;

use tracing::warn;

use crate::storage::{
    Collection, DocumentStore, Fields, Result, CREATED_AT_FIELD, OWNER_FIELD, UPDATED_AT_FIELD,
};


/// Repository for one owner's documents.
///
/// Backend errors are returned unchanged; nothing is retried.
#[derive(Clone)]
pub struct DocumentRepository {
    store: Arc<dyn DocumentStore>,
    owner_id: String,
}

impl DocumentRepository {
    pub fn new(store: Arc<dyn DocumentStore>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Create a record owned by this repository's owner.
    #[tracing::instrument(name = "repository.create", skip_all, fields(%collection, owner = %self.owner_id))]
    pub async fn create(&self, collection: Collection, record: Fields) -> Result<String> {
        let fields = record
            .set(OWNER_FIELD, self.owner_id.as_str())
            .server_timestamp(CREATED_AT_FIELD);
        self.store.create(collection, fields).await
    }

    /// Apply a partial update. Ownership is never reassigned.
    #[tracing::instrument(name = "repository.update", skip_all, fields(%collection, %id))]
    pub async fn update(&self, collection: Collection, id: &str, mut patch: Fields) -> Result<()> {
        if patch.remove(OWNER_FIELD).is_some() {
            warn!(%collection, %id, "Ignoring owner field in update");
        }
        let patch = patch.server_timestamp(UPDATED_AT_FIELD);
        self.store.update(collection, id, patch).await
    }

    #[tracing::instrument(name = "repository.delete", skip_all, fields(%collection, %id))]
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.store.delete(collection, id).await
    }

    /// Create or merge into a record with a caller-chosen id.
    #[tracing::instrument(name = "repository.upsert_merge", skip_all, fields(%collection, %id))]
    pub async fn upsert_merge(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        self.store.set_merge(collection, id, fields).await
    }
}
