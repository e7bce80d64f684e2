//! Aggregate recomputation steps.

use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use cucumber::{given, then, when};
use expense_sync::model::{CategoryPatch, FromDocument, NewExpense, UserStats};
use expense_sync::storage::{Collection, Query};
use rust_decimal::Decimal;

use super::{eventually, SyncWorld};

fn amount(word: &str) -> Decimal {
    Decimal::from_str(word).expect("amount must be a decimal number")
}

async fn stats(world: &SyncWorld, uid: &str) -> Option<UserStats> {
    world
        .store()
        .get(Collection::Users, uid)
        .await
        .expect("get should succeed")
        .map(|doc| UserStats::from_document(&doc).expect("stats should decode"))
}

#[given("writes to user stats fail")]
async fn given_stats_writes_fail(world: &mut SyncWorld) {
    world.memory().set_fail_on_write(Collection::Users, true).await;
}

#[when(expr = "the user adds an expense of {word} in {string}")]
async fn when_add_expense(world: &mut SyncWorld, value: String, category: String) {
    let expense = NewExpense::new(
        format!("{} expense", category),
        amount(&value),
        category,
        Local::now().date_naive(),
    );
    let id = world
        .session()
        .expenses()
        .add(expense)
        .await
        .expect("add should succeed");
    world.last_expense_id = Some(id);
}

#[when("the user deletes that expense")]
async fn when_delete_expense(world: &mut SyncWorld) {
    let id = world
        .last_expense_id
        .clone()
        .expect("no expense added in this scenario");
    world
        .session()
        .expenses()
        .delete(&id)
        .await
        .expect("delete should succeed");
}

#[when(expr = "the user sets the budget of {string} to {word}")]
async fn when_set_budget(world: &mut SyncWorld, name: String, value: String) {
    let categories = world.session().categories();
    eventually(&format!("category {}", name), || {
        categories.current().records.iter().any(|c| c.name == name)
    })
    .await;
    let category = categories
        .current()
        .records
        .into_iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no category named {}", name));
    categories
        .update(
            &category.id,
            CategoryPatch {
                budget: Some(amount(&value)),
                ..CategoryPatch::default()
            },
        )
        .await
        .expect("update should succeed");
}

#[then(expr = "the stats for {string} show total spent of {word}")]
async fn then_total_spent(world: &mut SyncWorld, uid: String, value: String) {
    let stats = stats(world, &uid).await.expect("stats record should exist");
    assert_eq!(stats.total_spent, amount(&value));
}

#[then(expr = "the stats for {string} eventually show total spent of {word}")]
async fn then_total_spent_eventually(world: &mut SyncWorld, uid: String, value: String) {
    let expected = amount(&value);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(stats) = stats(world, &uid).await {
            if stats.total_spent == expected {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("total spent for {} never reached {}", uid, expected);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[then(expr = "the stats for {string} show a budget of {word}")]
async fn then_total_budget(world: &mut SyncWorld, uid: String, value: String) {
    let stats = stats(world, &uid).await.expect("stats record should exist");
    assert_eq!(stats.total_budget, amount(&value));
}

#[then(expr = "{string} has no stats record")]
async fn then_no_stats(world: &mut SyncWorld, uid: String) {
    assert!(stats(world, &uid).await.is_none());
}

#[then(expr = "the expense count for {string} is {int}")]
async fn then_expense_count(world: &mut SyncWorld, uid: String, count: usize) {
    let docs = world
        .store()
        .query(&Query::new(Collection::Expenses).owned_by(uid.as_str()))
        .await
        .expect("query should succeed");
    assert_eq!(docs.len(), count);
}
