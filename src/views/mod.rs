//! Derived views over snapshot records.
//!
//! Everything here is a pure function of its inputs. The current date is
//! always passed in.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::model::Expense;

pub mod dashboard;
pub mod export;
pub mod filter;
pub mod leaderboard;
pub mod reports;

pub use dashboard::{budget_alerts, summarize, AlertSeverity, BudgetAlert, DashboardSummary};
pub use filter::{pending_approvals, ExpenseFilter};
pub use leaderboard::{
    category_leaderboard, friends_leaderboard, CategoryStanding, FriendStanding, Timeframe,
};
pub use reports::{build_report, CategoryTotal, MonthlyTotal, Report};

/// `YYYY-MM` key of the month containing `date`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Same day one month earlier, clamped to the month's last day.
pub fn previous_month(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(1)).unwrap_or(date)
}

pub fn total<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Decimal {
    expenses.into_iter().map(|e| e.amount).sum()
}

/// Mean amount; zero for no expenses.
pub fn average(expenses: &[Expense]) -> Decimal {
    if expenses.is_empty() {
        return Decimal::ZERO;
    }
    total(expenses) / Decimal::from(expenses.len())
}
