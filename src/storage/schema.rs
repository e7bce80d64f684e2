//! Database schema definitions using sea-query.
//!
//! Documents from every collection share one table, keyed by
//! (collection, id), with the fields stored as JSON text.

use sea_query::Iden;

/// Documents table schema.
#[derive(Iden)]
pub enum Documents {
    Table,
    #[iden = "collection"]
    Collection,
    #[iden = "id"]
    Id,
    #[iden = "data"]
    Data,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;
