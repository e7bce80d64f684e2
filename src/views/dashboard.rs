//! Dashboard summary and budget alerts.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{average, month_key, previous_month, total};
use crate::model::{Category, Expense, ExpenseStatus};

/// Number of recent expenses shown.
pub const RECENT_LIMIT: usize = 5;
/// Budget usage percentage that raises an alert.
pub const ALERT_THRESHOLD_PERCENT: i64 = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total: Decimal,
    pub this_month: Decimal,
    pub last_month: Decimal,
    /// Percentage change from last month; zero when last month had no spend.
    pub monthly_change_percent: Decimal,
    pub average: Decimal,
    /// First expenses in snapshot order.
    pub recent: Vec<Expense>,
    pub awaiting_approval: usize,
}

pub fn summarize(expenses: &[Expense], today: NaiveDate) -> DashboardSummary {
    let this_key = month_key(today);
    let last_key = month_key(previous_month(today));

    let this_month = total(expenses.iter().filter(|e| month_key(e.date) == this_key));
    let last_month = total(expenses.iter().filter(|e| month_key(e.date) == last_key));
    let monthly_change_percent = if last_month > Decimal::ZERO {
        (this_month - last_month) / last_month * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    DashboardSummary {
        total: total(expenses),
        this_month,
        last_month,
        monthly_change_percent,
        average: average(expenses),
        recent: expenses.iter().take(RECENT_LIMIT).cloned().collect(),
        awaiting_approval: expenses
            .iter()
            .filter(|e| e.status == ExpenseStatus::Submitted)
            .count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetAlert {
    pub category: String,
    pub budget: Decimal,
    pub spent: Decimal,
    pub percent_used: Decimal,
    pub severity: AlertSeverity,
}

impl BudgetAlert {
    pub fn is_over_budget(&self) -> bool {
        self.spent > self.budget
    }
}

/// Categories whose spend this month, up to `today`, reached the alert
/// threshold. Categories without a budget never alert.
pub fn budget_alerts(
    expenses: &[Expense],
    categories: &[Category],
    today: NaiveDate,
) -> Vec<BudgetAlert> {
    let this_key = month_key(today);
    let mut spend: HashMap<&str, Decimal> = HashMap::new();
    for expense in expenses
        .iter()
        .filter(|e| e.date <= today && month_key(e.date) == this_key)
    {
        *spend.entry(expense.category.as_str()).or_default() += expense.amount;
    }

    let threshold = Decimal::from(ALERT_THRESHOLD_PERCENT);
    categories
        .iter()
        .filter(|c| c.budget > Decimal::ZERO)
        .filter_map(|c| {
            let spent = spend.get(c.name.as_str()).copied().unwrap_or_default();
            let percent_used = spent / c.budget * Decimal::ONE_HUNDRED;
            if percent_used < threshold {
                return None;
            }
            let severity = if percent_used >= Decimal::ONE_HUNDRED {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            Some(BudgetAlert {
                category: c.name.clone(),
                budget: c.budget,
                spent,
                percent_used,
                severity,
            })
        })
        .collect()
}
