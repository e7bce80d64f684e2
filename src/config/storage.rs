//! Storage configuration types.

use serde::Deserialize;

use crate::storage::IndexSpec;

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Sqlite,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// In-memory store configuration.
    pub memory: MemoryConfig,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
}

/// In-memory store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Reject filtered+ordered queries unless a matching index is declared.
    pub require_indexes: bool,
    /// Declared composite indexes.
    pub indexes: Vec<IndexSpec>,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path. Parent directories are created on startup.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/expense-sync.db".to_string(),
        }
    }
}
