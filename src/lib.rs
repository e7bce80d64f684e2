//! expense-sync - reactive expense tracking core
//!
//! Keeps local view state for a user's expenses and categories consistent
//! with a live document store, degrading to unordered queries when the
//! preferred indexed query cannot be opened, and maintaining the user's
//! derived budget/spend totals after every mutation.

pub mod auth;
pub mod config;
pub mod model;
pub mod repository;
pub mod session;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod views;

#[cfg(test)]
pub(crate) mod test_utils;
