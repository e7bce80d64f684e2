//! Category and friends leaderboards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use super::month_key;
use crate::model::{Expense, UserStats};

/// Number of other users shown on the friends leaderboard.
pub const FRIENDS_LIMIT: usize = 10;

/// Window of expenses ranked on the category leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    All,
    /// Calendar month containing today.
    Month,
    /// The last seven days, inclusive.
    Week,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::All => "all",
            Timeframe::Month => "month",
            Timeframe::Week => "week",
        }
    }

    pub fn includes(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Timeframe::All => true,
            Timeframe::Month => month_key(date) == month_key(today),
            Timeframe::Week => date >= today - Duration::days(7),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Timeframe::All),
            "month" => Ok(Timeframe::Month),
            "week" => Ok(Timeframe::Week),
            other => Err(format!("unknown timeframe: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStanding {
    /// 1-based.
    pub rank: usize,
    pub category: String,
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
}

/// Rank categories by spend within `timeframe`, highest first.
pub fn category_leaderboard(
    expenses: &[Expense],
    timeframe: Timeframe,
    today: NaiveDate,
) -> Vec<CategoryStanding> {
    let mut totals: HashMap<&str, (Decimal, usize)> = HashMap::new();
    for expense in expenses.iter().filter(|e| timeframe.includes(e.date, today)) {
        let entry = totals.entry(expense.category.as_str()).or_default();
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let mut standings: Vec<_> = totals.into_iter().collect();
    standings.sort_by(|(a_name, (a_total, _)), (b_name, (b_total, _))| {
        b_total.cmp(a_total).then_with(|| a_name.cmp(b_name))
    });

    standings
        .into_iter()
        .enumerate()
        .map(|(i, (category, (total, count)))| CategoryStanding {
            rank: i + 1,
            category: category.to_string(),
            total,
            count,
            average: total / Decimal::from(count),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FriendStanding {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub budget: Decimal,
    pub spent: Decimal,
}

/// Rank other users by total spent, highest first, keeping the top ten.
pub fn friends_leaderboard(users: &[UserStats], self_id: &str) -> Vec<FriendStanding> {
    let mut others: Vec<&UserStats> = users.iter().filter(|u| u.user_id != self_id).collect();
    others.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    others
        .into_iter()
        .take(FRIENDS_LIMIT)
        .enumerate()
        .map(|(i, user)| FriendStanding {
            rank: i + 1,
            user_id: user.user_id.clone(),
            name: user.label(),
            budget: user.total_budget,
            spent: user.total_spent,
        })
        .collect()
}
