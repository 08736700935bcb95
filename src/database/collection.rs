use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::database::document::{timestamp, Document, Patch};
use crate::database::manager::DatabaseError;
use crate::database::store::DocumentStore;
use crate::filter::{Filter, FindOptions, CREATED_FIELD, ID_FIELD, RESERVED_FIELDS, UPDATED_FIELD};
use crate::types::Id;

/// Typed view of one physical collection. Stateless: no caching, no buffering.
pub struct DocCollection<T> {
    name: String,
    store: Arc<dyn DocumentStore>,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for DocCollection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: self.store.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> DocCollection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(name: impl Into<String>, store: Arc<dyn DocumentStore>) -> Result<Self, DatabaseError> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(Self {
            name,
            store,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `fields` under a fresh identity and return it
    pub async fn create_one(&self, fields: &T) -> Result<Id, DatabaseError> {
        let started = Instant::now();
        let mut doc = match serde_json::to_value(fields)? {
            Value::Object(map) => map,
            other => {
                return Err(DatabaseError::InvalidDocument(format!(
                    "{} payload must be an object, got {}",
                    self.name, other
                )))
            }
        };
        if let Some(reserved) = RESERVED_FIELDS.iter().find(|f| doc.contains_key(**f)) {
            return Err(DatabaseError::InvalidDocument(format!(
                "{} payload may not set '{}'",
                self.name, reserved
            )));
        }

        let id = Id::new();
        let now = timestamp::format(&timestamp::now());
        doc.insert(ID_FIELD.to_string(), id.into());
        doc.insert(CREATED_FIELD.to_string(), Value::String(now.clone()));
        doc.insert(UPDATED_FIELD.to_string(), Value::String(now));

        self.store.insert(&self.name, doc).await?;
        self.log_slow("create_one", started);
        Ok(id)
    }

    /// First match in natural order
    pub async fn read_one(&self, filter: Filter) -> Result<Option<Document<T>>, DatabaseError> {
        let started = Instant::now();
        filter.validate()?;
        let mut rows = self
            .store
            .find(&self.name, &filter, &FindOptions::default(), Some(1))
            .await?;
        self.log_slow("read_one", started);
        rows.pop().map(|row| self.decode(row)).transpose()
    }

    pub async fn read_by_id(&self, id: Id) -> Result<Option<Document<T>>, DatabaseError> {
        self.read_one(Filter::by_id(id)).await
    }

    /// Like `read_by_id` but a missing document is an error
    pub async fn read_404(&self, id: Id) -> Result<Document<T>, DatabaseError> {
        self.read_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} does not exist", self.name, id)))
    }

    pub async fn read_many(&self, filter: Filter, options: FindOptions) -> Result<Vec<Document<T>>, DatabaseError> {
        let started = Instant::now();
        filter.validate()?;
        let rows = self.store.find(&self.name, &filter, &options, None).await?;
        self.log_slow("read_many", started);
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Merge `patch` into the first match and refresh its modification timestamp.
    /// Identity and creation timestamp are never touched.
    pub async fn partial_update_one(&self, filter: Filter, patch: Patch) -> Result<Document<T>, DatabaseError> {
        let started = Instant::now();
        filter.validate()?;
        patch.validate()?;
        let updated = self.store.update_one(&self.name, &filter, &patch).await?;
        self.log_slow("partial_update_one", started);
        match updated {
            Some(row) => self.decode(row),
            None => Err(DatabaseError::NotFound(format!("no document in {} matches the update filter", self.name))),
        }
    }

    pub async fn delete_one(&self, filter: Filter) -> Result<(), DatabaseError> {
        let started = Instant::now();
        filter.validate()?;
        let deleted = self.store.delete(&self.name, &filter, false).await?;
        self.log_slow("delete_one", started);
        if deleted == 0 {
            return Err(DatabaseError::NotFound(format!("no document in {} matches the delete filter", self.name)));
        }
        Ok(())
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<u64, DatabaseError> {
        filter.validate()?;
        self.store.delete(&self.name, &filter, true).await
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, DatabaseError> {
        filter.validate()?;
        self.store.count(&self.name, &filter).await
    }

    fn decode(&self, row: Map<String, Value>) -> Result<Document<T>, DatabaseError> {
        serde_json::from_value(Value::Object(row)).map_err(|e| {
            tracing::error!("Failed to decode document from {}: {}", self.name, e);
            DatabaseError::Serialization(e)
        })
    }

    fn log_slow(&self, op: &str, started: Instant) {
        let elapsed = started.elapsed();
        let threshold = crate::config::config().storage.slow_operation_threshold_ms;
        if elapsed.as_millis() as u64 > threshold {
            tracing::warn!("Slow {} on {}: {:?}", op, self.name, elapsed);
        }
    }

    fn validate_name(name: &str) -> Result<(), DatabaseError> {
        crate::filter::filter::validate_field_name(name)
            .map_err(|_| DatabaseError::InvalidCollectionName(name.to_string()))
    }
}
