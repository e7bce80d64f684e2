//! Document store interface and implementations.
//!
//! This module contains:
//! - `DocumentStore` trait: writes, one-shot queries and live subscriptions
//! - Query and document types shared by all backends
//! - Implementations: in-memory (default), SQLite (feature `sqlite`)

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::info;

use crate::config::{StorageConfig, StorageType};

pub mod document;
pub mod live;
pub mod memory;
pub mod query;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use document::{
    Collection, Document, DocumentFields, FieldValue, Fields, CREATED_AT_FIELD, OWNER_FIELD,
    UPDATED_AT_FIELD,
};
pub use memory::MemoryDocumentStore;
pub use query::{Direction, Filter, FilterOp, IndexSpec, OrderBy, Query};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("Query on '{}' requires a composite index on {:?}", .index.collection, .index.fields)]
    MissingIndex { index: IndexSpec },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid document {collection}/{id}: {message}")]
    InvalidDocument {
        collection: Collection,
        id: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stream of full result-set snapshots for a live query.
///
/// Each item replaces the previous one. An `Err` item ends the stream.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Document>>>;

/// Interface to the backend document store.
///
/// Implementations:
/// - `MemoryDocumentStore`: in-process store, optional composite-index
///   enforcement and failure injection for tests
/// - `SqliteDocumentStore`: JSON documents in SQLite
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String>;

    /// Merge `patch` into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn update(&self, collection: Collection, id: &str, patch: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Create or merge into the document with the given id.
    async fn set_merge(&self, collection: Collection, id: &str, fields: Fields) -> Result<()>;

    /// Fetch a single document.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Run a one-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Open a live query.
    ///
    /// Errors returned here are open failures (e.g. a missing index). Once
    /// open, the stream yields the current result set immediately and a new
    /// full result set whenever it changes.
    async fn listen(&self, query: Query) -> Result<SnapshotStream>;
}

/// Initialize the document store based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.storage_type {
        StorageType::Memory => {
            let store = if config.memory.require_indexes {
                MemoryDocumentStore::with_required_indexes(config.memory.indexes.clone())
            } else {
                MemoryDocumentStore::new()
            };
            info!(
                storage_type = "memory",
                require_indexes = config.memory.require_indexes,
                "Document store initialized"
            );
            Ok(Arc::new(store))
        }
        StorageType::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let pool =
                    sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.sqlite.path))
                        .await?;

                let store = SqliteDocumentStore::new(pool);
                store.init().await?;

                info!(storage_type = "sqlite", path = %config.sqlite.path, "Document store initialized");
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "sqlite"))]
            {
                tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
                Err("SQLite support requires the 'sqlite' feature. Rebuild with --features sqlite".into())
            }
        }
    }
}
