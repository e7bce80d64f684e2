//! Default category set for new users.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;

use crate::model::NewCategory;

/// Categories created for a user with none, with monthly budgets.
pub const DEFAULT_CATEGORIES: [(&str, i64); 5] = [
    ("Food", 500),
    ("Transportation", 200),
    ("Entertainment", 100),
    ("Utilities", 300),
    ("Healthcare", 150),
];

pub fn default_categories() -> Vec<NewCategory> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, budget)| NewCategory::new(*name, Decimal::from(*budget)))
        .collect()
}

/// Decides seeding once per subscription lifetime.
///
/// Only the first snapshot is considered; later snapshots never seed,
/// even when empty.
#[derive(Debug, Default)]
pub struct BootstrapGuard {
    observed: AtomicBool,
}

impl BootstrapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_seed(&self, is_empty: bool) -> bool {
        let first = !self.observed.swap(true, Ordering::SeqCst);
        first && is_empty
    }
}
