//! Document, collection and write-field types shared by all backends.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the owning user id on every user-scoped document.
pub const OWNER_FIELD: &str = "userId";
/// Server timestamp stamped on create.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Server timestamp stamped on update.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Stored document body.
pub type DocumentFields = Map<String, Value>;

/// Named document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Expenses,
    Categories,
    /// Per-user profile and derived statistics, keyed by user id.
    Users,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Expenses,
        Collection::Categories,
        Collection::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Expenses => "expenses",
            Collection::Categories => "categories",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

/// A stored document: store-assigned id plus its JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: DocumentFields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: DocumentFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.get(OWNER_FIELD).and_then(Value::as_str)
    }
}

/// Value written to a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Resolved by the backend to its own clock at write time.
    ServerTimestamp,
}

/// Set of field writes for a create, update or merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build writes from any value that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::Value(v)))
                    .collect(),
            )),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0
            .insert(field.into(), FieldValue::Value(value.into()));
        self
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldValue::ServerTimestamp);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Replace server-timestamp sentinels with `now` and produce stored fields.
    pub fn resolve(self, now: DateTime<Utc>) -> DocumentFields {
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.0
            .into_iter()
            .map(|(field, value)| {
                let value = match value {
                    FieldValue::Value(v) => v,
                    FieldValue::ServerTimestamp => Value::String(stamp.clone()),
                };
                (field, value)
            })
            .collect()
    }
}

/// Shallow-merge `patch` into `target`, field by field.
pub fn merge_fields(target: &mut DocumentFields, patch: DocumentFields) {
    for (field, value) in patch {
        target.insert(field, value);
    }
}
