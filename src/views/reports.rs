//! Spending reports.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::{average, month_key, total};
use crate::model::Expense;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    /// `YYYY-MM`.
    pub month: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Sorted by category name.
    pub by_category: Vec<CategoryTotal>,
    /// Sorted by month, oldest first.
    pub by_month: Vec<MonthlyTotal>,
    pub total: Decimal,
    pub average: Decimal,
}

pub fn spending_by_category(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_default() += expense.amount;
    }
    totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect()
}

pub fn spending_by_month(expenses: &[Expense]) -> Vec<MonthlyTotal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(month_key(expense.date)).or_default() += expense.amount;
    }
    totals
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

pub fn build_report(expenses: &[Expense]) -> Report {
    Report {
        by_category: spending_by_category(expenses),
        by_month: spending_by_month(expenses),
        total: total(expenses),
        average: average(expenses),
    }
}
