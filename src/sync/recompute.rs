//! Derived per-user totals.
//!
//! `users/{owner}` carries the sum of the owner's category budgets and
//! expense amounts. Totals are recomputed from scratch after every mutation
//! rather than adjusted incrementally. Each document's raw `budget` or
//! `amount` field is summed whether or not the rest of the record decodes; a
//! numeric string counts as its value and anything else counts as zero.
//! Concurrent recomputations for one owner are not serialized; the last
//! write wins.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error};

use super::tasks::BackgroundTasks;
use crate::model::money_value;
use crate::repository::DocumentRepository;
use crate::storage::{Collection, Document, Fields, Query, Result, UPDATED_AT_FIELD};

/// Totals written to the owner's stats record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTotals {
    pub total_budget: Decimal,
    pub total_spent: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsRecord {
    #[serde(with = "rust_decimal::serde::float")]
    budget: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    total_spent: Decimal,
}

fn sum_field(docs: &[Document], field: &str) -> Decimal {
    docs.iter()
        .map(|doc| match doc.get(field) {
            None | Some(serde_json::Value::Null) => Decimal::ZERO,
            Some(value) => money_value(value).unwrap_or_else(|| {
                debug!(id = %doc.id, field, "Unparseable value counted as zero");
                Decimal::ZERO
            }),
        })
        .sum()
}

/// Rescan the owner's categories and expenses and overwrite their totals.
#[tracing::instrument(name = "stats.recompute", skip_all, fields(owner = %repository.owner_id()))]
pub async fn recompute_user_stats(repository: &DocumentRepository) -> Result<StatsTotals> {
    let owner = repository.owner_id();
    let store = repository.store();

    let categories = store
        .query(&Query::new(Collection::Categories).owned_by(owner))
        .await?;
    let expenses = store
        .query(&Query::new(Collection::Expenses).owned_by(owner))
        .await?;

    let totals = StatsTotals {
        total_budget: sum_field(&categories, "budget"),
        total_spent: sum_field(&expenses, "amount"),
    };

    let record = StatsRecord {
        budget: totals.total_budget,
        total_spent: totals.total_spent,
    };
    let fields = Fields::from_serialize(&record)?.server_timestamp(UPDATED_AT_FIELD);
    repository
        .upsert_merge(Collection::Users, owner, fields)
        .await?;

    debug!(
        budget = %totals.total_budget,
        spent = %totals.total_spent,
        "User stats recomputed"
    );
    Ok(totals)
}

/// Spawns detached recomputations for one owner.
#[derive(Clone)]
pub struct StatsRecomputer {
    repository: DocumentRepository,
    tasks: BackgroundTasks,
}

impl StatsRecomputer {
    pub fn new(repository: DocumentRepository, tasks: BackgroundTasks) -> Self {
        Self { repository, tasks }
    }

    /// Recompute in the background. Failures are logged, never returned.
    pub fn spawn(&self, trigger: &'static str) {
        let repository = self.repository.clone();
        self.tasks.spawn(async move {
            if let Err(e) = recompute_user_stats(&repository).await {
                error!(
                    owner = %repository.owner_id(),
                    trigger,
                    error = %e,
                    "Failed to recompute user stats"
                );
            }
        });
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Wait for all recomputations spawned so far.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }
}
