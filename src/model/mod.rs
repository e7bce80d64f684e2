//! Typed records decoded from store documents.
//!
//! Documents are camelCase JSON objects; the store-assigned id is injected
//! as `id` before decoding. Money fields are `Decimal` values written as JSON
//! numbers; numeric strings from other writers are accepted on read.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::storage::Document;

mod category;
mod expense;
mod lenient;
mod user;


pub use category::{Category, CategoryPatch, NewCategory};
pub use expense::{Expense, ExpensePatch, ExpenseStatus, NewExpense};
pub use lenient::money_value;
pub use user::{UserProfile, UserStats};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors decoding or validating records.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to decode document {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Budget must not be negative: {0}")]
    NegativeBudget(Decimal),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Decode a document into `T`, exposing its id as the `id` field.
pub fn decode<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_string(), serde_json::Value::String(doc.id.clone()));
    serde_json::from_value(serde_json::Value::Object(fields)).map_err(|source| ModelError::Decode {
        id: doc.id.clone(),
        source,
    })
}

/// Records that can be read from a store document.
pub trait FromDocument: DeserializeOwned {
    fn from_document(doc: &Document) -> Result<Self> {
        decode(doc)
    }
}

impl FromDocument for Expense {}
impl FromDocument for Category {}
impl FromDocument for UserStats {}
