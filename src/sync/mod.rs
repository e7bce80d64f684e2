//! Live synchronization between the document store and local view state.
//!
//! This module contains:
//! - `subscribe`: live query delivery into a `SnapshotSink`
//! - `subscribe_with_fallback`: the Preferred/Fallback/Failed query state machine
//! - `LiveView`: reactive view state published through `tokio::sync::watch`
//! - `StatsRecomputer`: detached recomputation of a user's derived totals
//! - `BootstrapGuard`: one-shot seeding of default categories

mod defaults;
mod fallback;
mod recompute;
mod subscription;
mod tasks;
mod view;


pub use defaults::{default_categories, BootstrapGuard, DEFAULT_CATEGORIES};
pub use fallback::{subscribe_with_fallback, FallbackSubscription, QueryFailure, QueryState};
pub use recompute::{recompute_user_stats, StatsRecomputer, StatsTotals};
pub use subscription::{subscribe, SnapshotSink, Subscription};
pub use tasks::BackgroundTasks;
pub use view::{LiveView, ViewState};
