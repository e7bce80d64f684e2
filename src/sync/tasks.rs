//! Tracking for detached background work.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::warn;

/// Handles for detached tasks.
///
/// Tasks run to completion on their own; dropping the tracker or its
/// owner never cancels them. `settle` lets callers wait for quiescence.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.len()
    }

    /// Wait until every task spawned so far, and any task they spawn in
    /// turn, has finished.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        warn!(error = %e, "Background task panicked");
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
