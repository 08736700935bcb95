use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::document::Patch;
use crate::database::manager::DatabaseError;
use crate::database::store::DocumentStore;
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::FilterWhere;
use crate::filter::{Filter, FindOptions, ID_FIELD};

/// PostgreSQL backend: one table per collection holding `(seq, id, doc jsonb)`.
/// `seq` is the natural order used for ties and for `read_one`.
pub struct PgStore {
    pool: PgPool,
    ready: RwLock<HashSet<String>>,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Connected PostgreSQL document store (max_connections={})", max_connections);
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            ready: RwLock::new(HashSet::new()),
        }
    }

    /// Quote SQL identifier to prevent injection
    fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Create the collection table on first use
    async fn table(&self, collection: &str) -> Result<String, DatabaseError> {
        let table = Self::quote_identifier(collection);

        // Fast path: try read lock
        {
            let ready = self.ready.read().await;
            if ready.contains(collection) {
                return Ok(table);
            }
        }

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (seq BIGSERIAL, id UUID PRIMARY KEY, doc JSONB NOT NULL)",
            table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        let mut ready = self.ready.write().await;
        if ready.insert(collection.to_string()) {
            info!("Prepared collection table: {}", collection);
        }
        Ok(table)
    }

    fn document_id(collection: &str, doc: &Map<String, Value>) -> Result<Uuid, DatabaseError> {
        doc.get(ID_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| DatabaseError::InvalidDocument(format!("document in {} has no valid _id", collection)))
    }

    fn into_object(collection: &str, value: Value) -> Result<Map<String, Value>, DatabaseError> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(DatabaseError::InvalidDocument(format!(
                "stored document in {} is not an object: {}",
                collection, other
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), DatabaseError> {
        let table = self.table(collection).await?;
        let id = Self::document_id(collection, &doc)?;
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", table);
        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DatabaseError::DuplicateId(id.to_string(), collection.to_string())
                }
                _ => DatabaseError::Sqlx(e),
            })?;
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        limit: Option<usize>,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let table = self.table(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, 0)?;
        let order_clause = FilterOrder::generate(options.sort.as_ref())?;
        let limit_clause = limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default();
        let sql = format!("SELECT doc FROM {} WHERE {} {}{}", table, where_clause, order_clause, limit_clause);

        let mut q = sqlx::query_scalar::<_, Value>(&sql);
        for p in params {
            q = q.bind(p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|v| Self::into_object(collection, v)).collect()
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let table = self.table(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, 2)?;

        // Merge and unset in one statement; the modification stamp never moves backwards.
        let sql = format!(
            "UPDATE {table} SET doc = jsonb_set((doc || $1::jsonb) - $2::text[], '{{dateUpdated}}', \
             to_jsonb(to_char(GREATEST(clock_timestamp(), (doc ->> 'dateUpdated')::timestamptz + interval '1 microsecond') \
             AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"'))) \
             WHERE seq = (SELECT seq FROM {table} WHERE {where_clause} ORDER BY seq LIMIT 1) RETURNING doc",
        );

        let mut q = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(patch.merge_object()))
            .bind(patch.unset_fields());
        for p in params {
            q = q.bind(p);
        }
        let row = q.fetch_optional(&self.pool).await?;
        row.map(|v| Self::into_object(collection, v)).transpose()
    }

    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64, DatabaseError> {
        let table = self.table(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, 0)?;
        let sql = if many {
            format!("DELETE FROM {} WHERE {}", table, where_clause)
        } else {
            format!(
                "DELETE FROM {table} WHERE seq = (SELECT seq FROM {table} WHERE {where_clause} ORDER BY seq LIMIT 1)"
            )
        };

        let mut q = sqlx::query(&sql);
        for p in params {
            q = q.bind(p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DatabaseError> {
        let table = self.table(collection).await?;
        let (where_clause, params) = FilterWhere::generate(filter, 0)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, where_clause);

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for p in params {
            q = q.bind(p);
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(PgStore::quote_identifier("posts"), "\"posts\"");
        assert_eq!(PgStore::quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn requires_valid_document_id() {
        let mut doc = Map::new();
        assert!(PgStore::document_id("c", &doc).is_err());
        let id = Uuid::new_v4();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        assert_eq!(PgStore::document_id("c", &doc).unwrap(), id);
    }
}
