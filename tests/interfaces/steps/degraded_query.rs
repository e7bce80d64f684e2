//! Degraded-query fallback steps.

use chrono::NaiveDate;
use cucumber::{given, then, when};
use expense_sync::model::NewExpense;
use expense_sync::session::ExpenseStore;
use expense_sync::storage::{Collection, IndexSpec};
use expense_sync::sync::QueryState;
use rust_decimal::Decimal;

use super::{eventually, list, SyncWorld};

fn parse_state(name: &str) -> QueryState {
    match name {
        "preferred" => QueryState::Preferred,
        "fallback" => QueryState::Fallback,
        "failed" => QueryState::Failed,
        other => panic!("unknown query state: {}", other),
    }
}

// --- Given steps ---

#[given("the expense index is declared")]
async fn given_expense_index(world: &mut SyncWorld) {
    let index = ExpenseStore::preferred_query("any")
        .required_index()
        .expect("expense query needs a composite index");
    assert_eq!(index, IndexSpec::new(Collection::Expenses, ["userId", "date"]));
    world.memory().add_index(index).await;
}

#[given("live queries cannot be opened")]
async fn given_listen_fails(world: &mut SyncWorld) {
    world.memory().set_fail_on_listen(true).await;
}

// --- When steps ---

#[when(expr = "the user adds an expense dated {string}")]
async fn when_add_expense_dated(world: &mut SyncWorld, date: String) {
    let date: NaiveDate = date.parse().expect("dates must be YYYY-MM-DD");
    let id = world
        .session()
        .expenses()
        .add(NewExpense::new("Added", Decimal::from(10), "Food", date))
        .await
        .expect("add should succeed");
    world.last_expense_id = Some(id);
}

#[when(expr = "the expenses live query breaks with {string}")]
async fn when_stream_breaks(world: &mut SyncWorld, message: String) {
    world
        .memory()
        .inject_stream_error(Collection::Expenses, message);
}

// --- Then steps ---

#[then(expr = "the expense view is in the {string} state")]
async fn then_query_state(world: &mut SyncWorld, state: String) {
    let expected = parse_state(&state);
    let expenses = world.session().expenses();
    eventually(&format!("{:?} state", expected), || {
        expenses.query_state() == expected && expenses.current().query_state == expected
    })
    .await;
}

#[then(expr = "the expense view lists dates {string}")]
async fn then_view_dates(world: &mut SyncWorld, dates: String) {
    let expected = list(&dates);
    let expenses = world.session().expenses();
    eventually(&format!("dates {:?}", expected), || {
        let listed: Vec<String> = expenses
            .current()
            .records
            .iter()
            .map(|e| e.date.to_string())
            .collect();
        listed == expected
    })
    .await;
}

#[then(expr = "the expense view shows the error {string}")]
async fn then_view_error(world: &mut SyncWorld, message: String) {
    let expenses = world.session().expenses();
    eventually("view error", || {
        expenses.current().error.as_deref() == Some(message.as_str())
    })
    .await;
    assert!(expenses.current().is_ready(), "an error ends loading");
}

#[then("the expense view is empty")]
async fn then_view_empty(world: &mut SyncWorld) {
    assert!(world.session().expenses().current().records.is_empty());
}
