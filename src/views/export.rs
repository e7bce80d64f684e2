//! CSV export.
//!
//! Every cell is double-quoted with embedded quotes doubled; rows are
//! joined with `\n` and there is no trailing newline.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use super::leaderboard::{CategoryStanding, FriendStanding, Timeframe};
use crate::model::Expense;

pub const EXPENSE_HEADERS: [&str; 7] = [
    "Title", "Amount", "Category", "Date", "Vendor", "Status", "Notes",
];
pub const CATEGORY_LEADERBOARD_HEADERS: [&str; 5] = [
    "Rank",
    "Category",
    "Total Spent",
    "Transaction Count",
    "Average Amount",
];
pub const FRIENDS_HEADERS: [&str; 4] = ["Rank", "Name", "Budget", "Spent"];

pub const EXPENSES_FILENAME: &str = "expenses.csv";

/// `$1234.50` style amount, halves rounded away from zero.
pub fn money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.2}", rounded)
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn to_csv<I, R>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let header = headers.iter().map(|h| quote(h)).collect::<Vec<_>>().join(",");
    std::iter::once(header)
        .chain(rows.into_iter().map(|row| {
            row.into_iter()
                .map(|cell| quote(&cell))
                .collect::<Vec<_>>()
                .join(",")
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn expenses_csv(expenses: &[Expense]) -> String {
    to_csv(
        &EXPENSE_HEADERS,
        expenses.iter().map(|e| {
            [
                e.title.clone(),
                e.amount.normalize().to_string(),
                e.category.clone(),
                e.date.to_string(),
                e.vendor.clone(),
                e.status.to_string(),
                e.notes.clone().unwrap_or_default(),
            ]
        }),
    )
}

pub fn category_leaderboard_csv(standings: &[CategoryStanding]) -> String {
    to_csv(
        &CATEGORY_LEADERBOARD_HEADERS,
        standings.iter().map(|s| {
            [
                s.rank.to_string(),
                s.category.clone(),
                money(s.total),
                s.count.to_string(),
                money(s.average),
            ]
        }),
    )
}

pub fn friends_csv(standings: &[FriendStanding]) -> String {
    to_csv(
        &FRIENDS_HEADERS,
        standings.iter().map(|s| {
            [
                s.rank.to_string(),
                s.name.clone(),
                money(s.budget),
                money(s.spent),
            ]
        }),
    )
}

pub fn category_leaderboard_filename(timeframe: Timeframe, today: NaiveDate) -> String {
    format!("expense-leaderboard-{}-{}.csv", timeframe, today)
}

pub fn friends_filename(today: NaiveDate) -> String {
    format!("friends-{}.csv", today)
}
