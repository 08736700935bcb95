use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::document::Patch;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FindOptions};

/// Physical storage behind every `DocCollection`. Documents are JSON objects that already
/// carry their identity and timestamps.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), DatabaseError>;

    /// Matching documents in natural (insertion) order unless `options` asks for a sort.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        limit: Option<usize>,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError>;

    /// Apply `patch` to the first match and return the stored result.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Map<String, Value>>, DatabaseError>;

    /// Delete the first match, or every match when `many` is set. Returns the count.
    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64, DatabaseError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
