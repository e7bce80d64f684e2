//! Test helpers shared by unit tests.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::storage::{Document, StorageError};
use crate::sync::{QueryState, SnapshotSink};

/// Build a document from a JSON object literal.
pub fn doc(id: &str, fields: Value) -> Document {
    match fields {
        Value::Object(map) => Document::new(id, map),
        _ => panic!("fields must be an object"),
    }
}

/// Everything a sink received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Snapshot(Vec<Document>),
    Error(String),
    State(QueryState),
}

/// Sink that records every call.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<Vec<Document>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Snapshot(docs) => Some(docs),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Field values of `field` in the latest snapshot.
    pub fn latest(&self, field: &str) -> Option<Vec<Value>> {
        self.snapshots().pop().map(|docs| {
            docs.iter()
                .map(|d| d.get(field).cloned().unwrap_or(Value::Null))
                .collect()
        })
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SnapshotSink for RecordingSink {
    fn snapshot(&self, docs: Vec<Document>) {
        self.record(SinkEvent::Snapshot(docs));
    }

    fn error(&self, error: &StorageError) {
        self.record(SinkEvent::Error(error.to_string()));
    }

    fn state_changed(&self, state: QueryState) {
        self.record(SinkEvent::State(state));
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not met within 2s");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let spawned tasks run for a moment.
pub async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Await `future`, panicking after two seconds.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}
