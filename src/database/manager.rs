use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::database::collection::DocCollection;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::store::DocumentStore;
use crate::filter::FilterError;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate identity {0} in collection {1}")]
    DuplicateId(String, String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns the physical persistence handle and hands out collections by name
#[derive(Clone)]
pub struct DatabaseManager {
    store: Arc<dyn DocumentStore>,
}

impl DatabaseManager {
    /// Open the backend selected by configuration
    pub async fn connect(config: &StorageConfig) -> Result<Self, DatabaseError> {
        let store: Arc<dyn DocumentStore> = match config.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
                Arc::new(PgStore::connect(url, config.max_connections).await?)
            }
        };
        info!("Using {} document store", store.name());
        Ok(Self { store })
    }

    /// Fresh in-memory store, used by tests and local development
    pub fn memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Typed handle on one physical collection
    pub fn collection<T>(&self, name: &str) -> Result<DocCollection<T>, DatabaseError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        DocCollection::new(name, self.store.clone())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_manager_is_healthy() {
        let db = DatabaseManager::memory();
        assert_eq!(db.backend_name(), "memory");
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn postgres_backend_requires_url() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            database_url: None,
            max_connections: 1,
            slow_operation_threshold_ms: 100,
        };
        let err = DatabaseManager::connect(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[test]
    fn rejects_bad_collection_names() {
        let db = DatabaseManager::memory();
        assert!(db.collection::<serde_json::Value>("posts").is_ok());
        assert!(db.collection::<serde_json::Value>("friend_requests").is_ok());
        assert!(db.collection::<serde_json::Value>("posts; DROP").is_err());
        assert!(db.collection::<serde_json::Value>("").is_err());
    }
}
