use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived totals and profile stored at `users/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(rename = "id")]
    pub user_id: String,
    /// Sum of all category budgets.
    #[serde(rename = "budget", default, with = "rust_decimal::serde::float")]
    pub total_budget: Decimal,
    /// Sum of all expense amounts.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Name shown for this user: display name, first name, email, then a
    /// short id.
    pub fn label(&self) -> String {
        [&self.display_name, &self.first_name, &self.email]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| {
                let short: String = self.user_id.chars().take(8).collect();
                format!("User {}", short)
            })
    }
}

/// Profile written when an account is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub display_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
}

impl UserProfile {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let first_name = first_name.into();
        let last_name = last_name.into();
        let display_name = format!("{} {}", first_name, last_name).trim().to_string();
        Self {
            first_name,
            last_name,
            email: email.into(),
            display_name,
            budget: Decimal::ZERO,
            total_spent: Decimal::ZERO,
        }
    }
}
