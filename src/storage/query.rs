//! Query model: owner/field filters plus single-field ordering.
//!
//! Queries are evaluated client-side by the reference backends, and the same
//! ordering rules are used to sort fallback snapshots locally, so a degraded
//! subscription presents records in the order the preferred one would have.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use super::document::{Collection, Document, OWNER_FIELD};

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// Single-field filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        // Range and equality comparisons only hold between values of one type.
        if type_rank(actual) != type_rank(&self.value) {
            return false;
        }
        let ordering = compare_values(Some(actual), Some(&self.value));
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Gte => ordering != Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Composite index a backend may require before serving a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct IndexSpec {
    pub collection: Collection,
    /// Filtered fields (sorted) followed by the ordering field.
    pub fields: Vec<String>,
}

impl IndexSpec {
    pub fn new<I, S>(collection: Collection, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Restrict to documents owned by `owner_id`.
    pub fn owned_by(self, owner_id: impl Into<String>) -> Self {
        self.where_eq(OWNER_FIELD, Value::String(owner_id.into()))
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Eq, value)
    }

    pub fn where_gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Gte, value)
    }

    pub fn where_lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Lte, value)
    }

    fn with_filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Same filters, no server-side ordering.
    pub fn without_order(&self) -> Self {
        Self {
            collection: self.collection,
            filters: self.filters.clone(),
            order_by: None,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filter and order a full collection scan.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if let Some(order) = &self.order_by {
            sort_documents(&mut matched, order);
        }
        matched
    }

    /// Composite index this query needs, if any.
    ///
    /// A query that filters on one field and orders by a different one
    /// cannot be served from single-field indexes.
    pub fn required_index(&self) -> Option<IndexSpec> {
        let order = self.order_by.as_ref()?;
        let mut fields: Vec<String> = self
            .filters
            .iter()
            .map(|f| f.field.clone())
            .filter(|f| *f != order.field)
            .collect();
        if fields.is_empty() {
            return None;
        }
        fields.sort();
        fields.dedup();
        fields.push(order.field.clone());
        Some(IndexSpec {
            collection: self.collection,
            fields,
        })
    }
}

/// Sort documents by `order`; ties fall back to document id.
pub fn sort_documents(docs: &mut [Document], order: &OrderBy) {
    docs.sort_by(|a, b| {
        let ordering = compare_values(a.get(&order.field), b.get(&order.field));
        let ordering = match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON field values; missing sorts with null, first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
