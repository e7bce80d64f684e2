//! SQLite document store.
//!
//! Each document is one row of JSON text. Queries load the collection and
//! filter/order in process with the same rules as the in-memory backend;
//! live queries re-run on this process's own writes.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Order, Query as SqlQuery, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::document::merge_fields;
use super::live::{live_snapshots, ChangeEvent, CHANGE_CHANNEL_CAPACITY};
use super::schema::{Documents, CREATE_DOCUMENTS_TABLE};
use super::{
    Collection, Document, DocumentFields, DocumentStore, Fields, Query, Result, SnapshotStream,
    StorageError,
};

/// SQLite implementation of DocumentStore.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteDocumentStore {
    /// Create a new SQLite document store.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn notify(&self, collection: Collection) {
        let _ = self.changes.send(ChangeEvent::Written(collection));
    }

    fn decode(collection: Collection, id: &str, data: &str) -> Result<DocumentFields> {
        serde_json::from_str(data).map_err(|e| StorageError::InvalidDocument {
            collection,
            id: id.to_string(),
            message: e.to_string(),
        })
    }

    async fn read_fields(
        conn: &mut SqliteConnection,
        collection: Collection,
        id: &str,
    ) -> Result<Option<DocumentFields>> {
        let query = SqlQuery::select()
            .column(Documents::Data)
            .from(Documents::Table)
            .and_where(Expr::col(Documents::Collection).eq(collection.as_str()))
            .and_where(Expr::col(Documents::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(Self::decode(collection, id, &data)?))
            }
            None => Ok(None),
        }
    }

    async fn write_fields(
        conn: &mut SqliteConnection,
        collection: Collection,
        id: &str,
        fields: &DocumentFields,
    ) -> Result<()> {
        let data = serde_json::to_string(fields)?;
        let now = Utc::now().to_rfc3339();

        let query = SqlQuery::insert()
            .into_table(Documents::Table)
            .columns([
                Documents::Collection,
                Documents::Id,
                Documents::Data,
                Documents::UpdatedAt,
            ])
            .values_panic([
                collection.as_str().into(),
                id.into(),
                data.into(),
                now.into(),
            ])
            .on_conflict(
                OnConflict::columns([Documents::Collection, Documents::Id])
                    .update_columns([Documents::Data, Documents::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn merge_in_tx(
        conn: &mut SqliteConnection,
        collection: Collection,
        id: &str,
        fields: Fields,
        require_existing: bool,
    ) -> Result<()> {
        let mut current = match Self::read_fields(conn, collection, id).await? {
            Some(current) => current,
            None if require_existing => {
                return Err(StorageError::NotFound {
                    collection,
                    id: id.to_string(),
                })
            }
            None => DocumentFields::new(),
        };
        merge_fields(&mut current, fields.resolve(Utc::now()));
        Self::write_fields(conn, collection, id, &current).await
    }

    /// Merge `fields` into a stored document inside one write transaction.
    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        require_existing: bool,
    ) -> Result<()> {
        // BEGIN IMMEDIATE takes the write lock upfront so concurrent
        // read-modify-write cycles serialize instead of deadlocking.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::merge_in_tx(&mut conn, collection, id, fields, require_existing).await;

        finish_transaction(&mut conn, result).await?;
        self.notify(collection);
        Ok(())
    }
}

/// Commit the open transaction if `outcome` succeeded, otherwise roll it
/// back. A failed COMMIT is rolled back too so the connection never returns
/// to the pool mid-transaction.
async fn finish_transaction(conn: &mut SqliteConnection, outcome: Result<()>) -> Result<()> {
    let outcome = match outcome {
        Ok(()) => sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(StorageError::from),
        Err(e) => Err(e),
    };

    if outcome.is_err() {
        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            warn!(error = %e, "Rollback did not complete");
        }
    }
    outcome
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut conn = self.pool.acquire().await?;
        Self::write_fields(&mut conn, collection, &id, &fields.resolve(Utc::now())).await?;
        debug!(%collection, %id, "Document created");
        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Fields) -> Result<()> {
        self.merge(collection, id, patch, true).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let query = SqlQuery::delete()
            .from_table(Documents::Table)
            .and_where(Expr::col(Documents::Collection).eq(collection.as_str()))
            .and_where(Expr::col(Documents::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() > 0 {
            self.notify(collection);
        }
        Ok(())
    }

    async fn set_merge(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        self.merge(collection, id, fields, false).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::read_fields(&mut conn, collection, id)
            .await?
            .map(|fields| Document::new(id, fields)))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let select = SqlQuery::select()
            .columns([Documents::Id, Documents::Data])
            .from(Documents::Table)
            .and_where(Expr::col(Documents::Collection).eq(query.collection.as_str()))
            .order_by(Documents::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&select).fetch_all(&self.pool).await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let data: String = row.get("data");
            let fields = Self::decode(query.collection, &id, &data)?;
            docs.push(Document::new(id, fields));
        }

        Ok(query.apply(docs))
    }

    async fn listen(&self, query: Query) -> Result<SnapshotStream> {
        let changes = self.changes.subscribe();
        Ok(live_snapshots(self.clone(), query, changes))
    }
}
