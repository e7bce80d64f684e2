use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{lenient, ModelError, Result};

/// A stored budget category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Monthly budget; absent or unparseable reads as zero.
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "lenient::money"
    )]
    pub budget: Decimal,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for creating a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, budget: Decimal) -> Self {
        Self {
            name: name.into(),
            budget,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_budget(self.budget)
    }
}

/// Partial category update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub budget: Option<Decimal>,
}

impl CategoryPatch {
    pub fn validate(&self) -> Result<()> {
        self.budget.map_or(Ok(()), check_budget)
    }
}

fn check_budget(budget: Decimal) -> Result<()> {
    if budget < Decimal::ZERO {
        return Err(ModelError::NegativeBudget(budget));
    }
    Ok(())
}
