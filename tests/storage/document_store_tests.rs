//! DocumentStore interface tests.
//!
//! These tests verify the contract of the DocumentStore trait.
//! Each storage implementation should run these tests. Tests share one
//! store, so every test scopes its documents to its own owner id.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::json;

use expense_sync::storage::{
    Collection, Direction, DocumentStore, Fields, Query, SnapshotStream, StorageError,
    CREATED_AT_FIELD, OWNER_FIELD,
};

async fn next_snapshot(stream: &mut SnapshotStream) -> Vec<expense_sync::storage::Document> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("snapshot should arrive")
        .expect("stream should stay open")
        .expect("snapshot should not be an error")
}

fn expense(owner: &str, title: &str, amount: i64, date: &str) -> Fields {
    Fields::new()
        .set(OWNER_FIELD, owner)
        .set("title", title)
        .set("amount", amount)
        .set("date", date)
}

// =============================================================================
// Write tests
// =============================================================================

pub async fn test_create_assigns_unique_ids<S: DocumentStore>(store: &S) {
    let first = store
        .create(Collection::Expenses, expense("test_ids", "A", 1, "2024-01-01"))
        .await
        .expect("create should succeed");
    let second = store
        .create(Collection::Expenses, expense("test_ids", "B", 2, "2024-01-02"))
        .await
        .expect("create should succeed");

    assert!(!first.is_empty());
    assert_ne!(first, second, "ids should be unique");

    let doc = store
        .get(Collection::Expenses, &first)
        .await
        .expect("get should succeed")
        .expect("document should exist");
    assert_eq!(doc.id, first);
    assert_eq!(doc.get("title"), Some(&json!("A")));
}

pub async fn test_get_missing_returns_none<S: DocumentStore>(store: &S) {
    let result = store
        .get(Collection::Categories, "test_missing")
        .await
        .expect("get should succeed");
    assert!(result.is_none(), "missing document should be None");
}

pub async fn test_update_merges_fields<S: DocumentStore>(store: &S) {
    let id = store
        .create(
            Collection::Categories,
            Fields::new()
                .set(OWNER_FIELD, "test_update")
                .set("name", "Food")
                .set("budget", 500),
        )
        .await
        .unwrap();

    store
        .update(Collection::Categories, &id, Fields::new().set("budget", 650))
        .await
        .expect("update should succeed");

    let doc = store.get(Collection::Categories, &id).await.unwrap().unwrap();
    assert_eq!(doc.get("name"), Some(&json!("Food")), "untouched field kept");
    assert_eq!(doc.get("budget"), Some(&json!(650)), "patched field replaced");
}

pub async fn test_update_missing_is_not_found<S: DocumentStore>(store: &S) {
    let result = store
        .update(Collection::Expenses, "test_no_such_doc", Fields::new().set("amount", 1))
        .await;
    assert!(
        matches!(result, Err(StorageError::NotFound { .. })),
        "update of missing document should be NotFound, got {:?}",
        result
    );
    let doc = store.get(Collection::Expenses, "test_no_such_doc").await.unwrap();
    assert!(doc.is_none(), "failed update must not create the document");
}

pub async fn test_delete_is_idempotent<S: DocumentStore>(store: &S) {
    let id = store
        .create(Collection::Expenses, expense("test_delete", "Gone", 5, "2024-01-01"))
        .await
        .unwrap();

    store.delete(Collection::Expenses, &id).await.expect("delete should succeed");
    store
        .delete(Collection::Expenses, &id)
        .await
        .expect("second delete should succeed");

    assert!(store.get(Collection::Expenses, &id).await.unwrap().is_none());
}

pub async fn test_set_merge_creates_and_merges<S: DocumentStore>(store: &S) {
    let id = "test_set_merge_user";

    store
        .set_merge(
            Collection::Users,
            id,
            Fields::new().set("displayName", "Ada").set("budget", 0),
        )
        .await
        .expect("set_merge should create");
    store
        .set_merge(
            Collection::Users,
            id,
            Fields::new().set("budget", 1250).set("totalSpent", 40),
        )
        .await
        .expect("set_merge should merge");

    let doc = store.get(Collection::Users, id).await.unwrap().unwrap();
    assert_eq!(doc.get("displayName"), Some(&json!("Ada")));
    assert_eq!(doc.get("budget"), Some(&json!(1250)));
    assert_eq!(doc.get("totalSpent"), Some(&json!(40)));
}

pub async fn test_server_timestamp_is_resolved<S: DocumentStore>(store: &S) {
    let before = Utc::now();
    let id = store
        .create(
            Collection::Categories,
            Fields::new()
                .set(OWNER_FIELD, "test_timestamp")
                .set("name", "Utilities")
                .server_timestamp(CREATED_AT_FIELD),
        )
        .await
        .unwrap();

    let doc = store.get(Collection::Categories, &id).await.unwrap().unwrap();
    let stamped: DateTime<Utc> = doc
        .get(CREATED_AT_FIELD)
        .and_then(|v| v.as_str())
        .expect("timestamp should be a string")
        .parse()
        .expect("timestamp should be RFC 3339");
    assert!(stamped.timestamp() >= before.timestamp());
}

// =============================================================================
// Query tests
// =============================================================================

pub async fn test_query_filters_by_owner<S: DocumentStore>(store: &S) {
    store
        .create(Collection::Expenses, expense("test_owner_a", "Mine", 10, "2024-02-01"))
        .await
        .unwrap();
    store
        .create(Collection::Expenses, expense("test_owner_b", "Theirs", 20, "2024-02-01"))
        .await
        .unwrap();

    let docs = store
        .query(&Query::new(Collection::Expenses).owned_by("test_owner_a"))
        .await
        .expect("query should succeed");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("title"), Some(&json!("Mine")));
}

pub async fn test_query_orders_and_ranges<S: DocumentStore>(store: &S) {
    let owner = "test_order";
    for (title, date) in [
        ("Jan", "2024-01-15"),
        ("Mar", "2024-03-15"),
        ("Feb", "2024-02-15"),
        ("Apr", "2024-04-15"),
    ] {
        store
            .create(Collection::Expenses, expense(owner, title, 1, date))
            .await
            .unwrap();
    }

    let docs = store
        .query(
            &Query::new(Collection::Expenses)
                .owned_by(owner)
                .where_gte("date", "2024-02-01")
                .where_lte("date", "2024-03-31")
                .order_by("date", Direction::Descending),
        )
        .await
        .unwrap();

    let titles: Vec<_> = docs.iter().filter_map(|d| d.get("title")).collect();
    assert_eq!(titles, vec![&json!("Mar"), &json!("Feb")]);
}

// =============================================================================
// Live query tests
// =============================================================================

pub async fn test_listen_delivers_initial_and_changed_snapshots<S: DocumentStore>(store: &S) {
    let owner = "test_listen";
    let first = store
        .create(Collection::Categories, Fields::new().set(OWNER_FIELD, owner).set("name", "Food"))
        .await
        .unwrap();

    let mut stream = store
        .listen(Query::new(Collection::Categories).owned_by(owner))
        .await
        .expect("listen should open");

    let initial = next_snapshot(&mut stream).await;
    assert_eq!(initial.len(), 1, "initial snapshot holds current documents");
    assert_eq!(initial[0].id, first);

    let second = store
        .create(Collection::Categories, Fields::new().set(OWNER_FIELD, owner).set("name", "Rent"))
        .await
        .unwrap();
    let after_create = next_snapshot(&mut stream).await;
    assert_eq!(after_create.len(), 2, "snapshot is the full result set");

    store.delete(Collection::Categories, &second).await.unwrap();
    let after_delete = next_snapshot(&mut stream).await;
    assert_eq!(after_delete.len(), 1);
    assert_eq!(after_delete[0].id, first);
}

pub async fn test_listen_skips_unrelated_writes<S: DocumentStore>(store: &S) {
    let owner = "test_listen_unrelated";
    let mut stream = store
        .listen(Query::new(Collection::Expenses).owned_by(owner))
        .await
        .unwrap();

    let initial = next_snapshot(&mut stream).await;
    assert!(initial.is_empty());

    // Neither write changes this result set.
    store
        .create(Collection::Categories, Fields::new().set(OWNER_FIELD, owner))
        .await
        .unwrap();
    store
        .create(Collection::Expenses, expense("test_someone_else", "Other", 1, "2024-01-01"))
        .await
        .unwrap();
    store
        .create(Collection::Expenses, expense(owner, "Mine", 3, "2024-01-01"))
        .await
        .unwrap();

    let next = next_snapshot(&mut stream).await;
    assert_eq!(next.len(), 1, "first delivered change is the matching write");
    assert_eq!(next[0].get("title"), Some(&json!("Mine")));
}

/// Run all DocumentStore contract tests against `$store`.
#[macro_export]
macro_rules! run_document_store_tests {
    ($store:expr) => {
        use $crate::storage::document_store_tests::*;

        // write tests
        test_create_assigns_unique_ids($store).await;
        println!("  test_create_assigns_unique_ids: PASSED");

        test_get_missing_returns_none($store).await;
        println!("  test_get_missing_returns_none: PASSED");

        test_update_merges_fields($store).await;
        println!("  test_update_merges_fields: PASSED");

        test_update_missing_is_not_found($store).await;
        println!("  test_update_missing_is_not_found: PASSED");

        test_delete_is_idempotent($store).await;
        println!("  test_delete_is_idempotent: PASSED");

        test_set_merge_creates_and_merges($store).await;
        println!("  test_set_merge_creates_and_merges: PASSED");

        test_server_timestamp_is_resolved($store).await;
        println!("  test_server_timestamp_is_resolved: PASSED");

        // query tests
        test_query_filters_by_owner($store).await;
        println!("  test_query_filters_by_owner: PASSED");

        test_query_orders_and_ranges($store).await;
        println!("  test_query_orders_and_ranges: PASSED");

        // live query tests
        test_listen_delivers_initial_and_changed_snapshots($store).await;
        println!("  test_listen_delivers_initial_and_changed_snapshots: PASSED");

        test_listen_skips_unrelated_writes($store).await;
        println!("  test_listen_skips_unrelated_writes: PASSED");
    };
}
