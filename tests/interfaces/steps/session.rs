//! Store setup and session lifecycle steps.

use chrono::NaiveDate;
use cucumber::{given, when};
use expense_sync::storage::{Collection, Fields, MemoryDocumentStore, OWNER_FIELD};

use super::{eventually, identity, list, SyncWorld};

// --- Background ---

#[given("a document store")]
async fn given_document_store(world: &mut SyncWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(crate::backend::StorageContext::new(world.backend).await);
}

#[given("an in-memory document store")]
async fn given_memory_store(world: &mut SyncWorld) {
    world.use_memory(MemoryDocumentStore::new());
}

#[given("a document store that enforces composite indexes")]
async fn given_indexed_store(world: &mut SyncWorld) {
    world.use_memory(MemoryDocumentStore::with_required_indexes(Vec::new()));
}

// --- Given steps ---

#[given(expr = "user {string} has expenses dated {string}")]
async fn given_expenses_dated(world: &mut SyncWorld, uid: String, dates: String) {
    let store = world.store();
    for date in list(&dates) {
        date.parse::<NaiveDate>().expect("dates must be YYYY-MM-DD");
        store
            .create(
                Collection::Expenses,
                Fields::new()
                    .set(OWNER_FIELD, uid.as_str())
                    .set("title", format!("Expense on {}", date))
                    .set("amount", 10)
                    .set("category", "Food")
                    .set("date", date.as_str())
                    .set("status", "submitted"),
            )
            .await
            .expect("create should succeed");
    }
}

#[given(expr = "user {string} has a category {string} with budget {int}")]
async fn given_category(world: &mut SyncWorld, uid: String, name: String, budget: i64) {
    world
        .store()
        .create(
            Collection::Categories,
            Fields::new()
                .set(OWNER_FIELD, uid.as_str())
                .set("name", name)
                .set("budget", budget),
        )
        .await
        .expect("create should succeed");
}

// --- When steps ---

#[when(expr = "{string} starts a session")]
async fn when_session_starts(world: &mut SyncWorld, uid: String) {
    world.session = Some(expense_sync::session::Session::start(
        world.store(),
        identity(&uid),
    ));
}

#[when("the expense view has loaded")]
async fn when_expense_view_loaded(world: &mut SyncWorld) {
    let session = world.session();
    eventually("expense view to load", || session.expenses().current().is_ready()).await;
}

/// Wait for both first snapshots, then for every task they triggered.
#[when("the session settles")]
async fn when_session_settles(world: &mut SyncWorld) {
    let session = world.session();
    eventually("views to load", || {
        session.expenses().current().is_ready() && session.categories().current().is_ready()
    })
    .await;
    session.settle().await;
}

#[when("the session ends")]
async fn when_session_ends(world: &mut SyncWorld) {
    if let Some(session) = world.session.take() {
        session.end();
    }
}
