//! Broadcast-driven live query streams.
//!
//! Backends publish a `ChangeEvent` after every committed write. Each live
//! query holds its own broadcast receiver and re-runs its query when its
//! collection changes, yielding the new result set only if it differs from
//! the last one delivered.

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;

use super::{Collection, Document, DocumentStore, Query, SnapshotStream, StorageError};

/// Channel capacity for change notifications.
pub const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Change notification published by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A document in the collection was created, updated or deleted.
    Written(Collection),
    /// Live queries on the collection lost their backend connection.
    Failed {
        collection: Collection,
        message: String,
    },
}

impl ChangeEvent {
    pub fn collection(&self) -> Collection {
        match self {
            ChangeEvent::Written(collection) => *collection,
            ChangeEvent::Failed { collection, .. } => *collection,
        }
    }
}

struct LiveState<S> {
    store: S,
    query: Query,
    changes: broadcast::Receiver<ChangeEvent>,
    last: Option<Vec<Document>>,
    done: bool,
}

/// Build a snapshot stream for `query`.
///
/// `changes` must be subscribed before this call so no write between the
/// initial read and the first wait is missed.
pub fn live_snapshots<S>(
    store: S,
    query: Query,
    changes: broadcast::Receiver<ChangeEvent>,
) -> SnapshotStream
where
    S: DocumentStore + Clone + 'static,
{
    let state = LiveState {
        store,
        query,
        changes,
        last: None,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            if st.last.is_some() {
                match st.changes.recv().await {
                    Ok(ChangeEvent::Written(collection)) if collection == st.query.collection => {}
                    Ok(ChangeEvent::Failed {
                        collection,
                        message,
                    }) if collection == st.query.collection => {
                        st.done = true;
                        return Some((Err(StorageError::Unavailable(message)), st));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Snapshots are wholesale, so a re-read covers anything missed.
                        debug!(
                            collection = %st.query.collection,
                            skipped,
                            "Live query lagged, re-reading"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }

            match st.store.query(&st.query).await {
                Ok(docs) => {
                    if st.last.as_ref() == Some(&docs) {
                        continue;
                    }
                    st.last = Some(docs.clone());
                    return Some((Ok(docs), st));
                }
                Err(e) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
            }
        }
    })
    .boxed()
}
