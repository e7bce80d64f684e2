//! Backend factory for interface tests.
//!
//! Provides a unified interface to create document stores based on environment configuration.

use std::env;
use std::sync::Arc;

use expense_sync::storage::{DocumentStore, MemoryDocumentStore};

#[cfg(feature = "sqlite")]
use expense_sync::storage::SqliteDocumentStore;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl StorageBackend {
    pub fn from_env() -> Self {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StorageBackend::Sqlite,
            _ => StorageBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Holds the document store for a backend.
pub struct StorageContext {
    pub store: Arc<dyn DocumentStore>,
    /// Temporary directory holding the database file, if any.
    #[allow(dead_code)]
    dir: Option<tempfile::TempDir>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("store", &"<dyn DocumentStore>")
            .field("dir", &self.dir)
            .finish()
    }
}

impl StorageContext {
    /// Create a storage context for the configured backend.
    pub async fn new(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Memory => Self::memory(MemoryDocumentStore::new()),
            StorageBackend::Sqlite => Self::create_sqlite().await,
        }
    }

    /// Wrap an already-configured memory store.
    pub fn memory(store: MemoryDocumentStore) -> Self {
        StorageContext {
            store: Arc::new(store),
            dir: None,
        }
    }

    #[cfg(feature = "sqlite")]
    async fn create_sqlite() -> Self {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("documents.db");
        let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path.display()))
            .await
            .expect("Failed to create SQLite pool");

        let store = SqliteDocumentStore::new(pool);
        store.init().await.expect("Failed to create schema");

        StorageContext {
            store: Arc::new(store),
            dir: Some(dir),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    async fn create_sqlite() -> Self {
        panic!("SQLite feature not enabled. Build with --features sqlite");
    }
}
