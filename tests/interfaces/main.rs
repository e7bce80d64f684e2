//! Interface tests for the sync layer using Cucumber.
//!
//! These scenarios drive sessions against a document store and verify the
//! degraded-query fallback, default category bootstrap and aggregate
//! recomputation. Select a backend via environment variable:
//!
//! ```bash
//! # In-memory (default)
//! cargo test --test interfaces
//!
//! # SQLite (temporary database file)
//! STORAGE_BACKEND=sqlite cargo test --test interfaces --features sqlite
//! ```
//!
//! Degraded-query scenarios always use the in-memory store, which can
//! enforce composite indexes and inject failures.

mod backend;
mod steps;

use cucumber::World;
use steps::SyncWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Degraded Query Interface Tests ===\n");
    SyncWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/degraded_query.feature")
        .await;

    println!("\n=== Running Default Bootstrap Interface Tests ===\n");
    SyncWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/bootstrap.feature")
        .await;

    println!("\n=== Running Aggregate Recomputation Interface Tests ===\n");
    SyncWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/recomputation.feature")
        .await;
}
