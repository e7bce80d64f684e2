//! Step definitions for the sync-layer interface tests.
//!
//! All features share `SyncWorld`: a document store, an optional handle to
//! the memory backend for failure injection, and the session under test.

use std::sync::Arc;
use std::time::Duration;

use cucumber::World;
use expense_sync::auth::Identity;
use expense_sync::session::Session;
use expense_sync::storage::{DocumentStore, MemoryDocumentStore};

use crate::backend::{StorageBackend, StorageContext};

pub mod degraded_query;
pub mod recomputation;
pub mod session;

/// Test context for sync-layer scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct SyncWorld {
    backend: StorageBackend,
    context: Option<StorageContext>,
    /// Set when the scenario needs memory-only failure injection.
    memory: Option<MemoryDocumentStore>,
    session: Option<Session>,
    last_expense_id: Option<String>,
}

impl std::fmt::Debug for SyncWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorld")
            .field("backend", &self.backend)
            .field("context", &self.context)
            .field("session", &self.session.as_ref().map(|s| s.identity().uid.clone()))
            .field("last_expense_id", &self.last_expense_id)
            .finish()
    }
}

impl SyncWorld {
    fn new() -> Self {
        Self {
            backend: StorageBackend::from_env(),
            context: None,
            memory: None,
            session: None,
            last_expense_id: None,
        }
    }

    fn store(&self) -> Arc<dyn DocumentStore> {
        self.context
            .as_ref()
            .expect("Storage context not initialized")
            .store
            .clone()
    }

    fn memory(&self) -> &MemoryDocumentStore {
        self.memory
            .as_ref()
            .expect("Scenario needs an in-memory document store")
    }

    fn session(&self) -> &Session {
        self.session.as_ref().expect("No session started")
    }

    fn use_memory(&mut self, store: MemoryDocumentStore) {
        self.context = Some(StorageContext::memory(store.clone()));
        self.memory = Some(store);
    }
}

pub fn identity(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        display_name: Some(uid.to_string()),
    }
}

/// Split a comma-separated step argument.
pub fn list(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Poll `check` until it returns true, failing the step after two seconds.
pub async fn eventually<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
