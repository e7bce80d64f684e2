//! Expense list filtering.

use chrono::NaiveDate;

use crate::model::{Expense, ExpenseStatus};

/// Expense list filter. Unset or blank criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Case-insensitive substring of title or vendor.
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    /// Exact category name.
    pub category: Option<String>,
    /// Case-insensitive substring of vendor.
    pub vendor: Option<String>,
}

impl ExpenseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        let title = expense.title.to_lowercase();
        let vendor = expense.vendor.to_lowercase();

        let search_ok = non_blank(&self.search).map_or(true, |needle| {
            let needle = needle.to_lowercase();
            title.contains(&needle) || vendor.contains(&needle)
        });
        let date_ok = self.date.map_or(true, |date| expense.date == date);
        let category_ok = non_blank(&self.category).map_or(true, |c| expense.category == c);
        let vendor_ok =
            non_blank(&self.vendor).map_or(true, |v| vendor.contains(&v.to_lowercase()));

        search_ok && date_ok && category_ok && vendor_ok
    }

    /// Matching expenses, in input order.
    pub fn apply(&self, expenses: &[Expense]) -> Vec<Expense> {
        expenses.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Expenses waiting for approval.
pub fn pending_approvals(expenses: &[Expense]) -> Vec<Expense> {
    expenses
        .iter()
        .filter(|e| e.status == ExpenseStatus::Submitted)
        .cloned()
        .collect()
}
