use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::types::Id;

const SESSION_KEY: &str = "record";

/// Per-client session state: at most one logged-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: Option<Id>,
}

/// Live session record handed to a handler. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(Arc<Mutex<SessionRecord>>);

impl SessionHandle {
    pub fn new(record: SessionRecord) -> Self {
        Self(Arc::new(Mutex::new(record)))
    }

    fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user(&self) -> Option<Id> {
        self.lock().user
    }

    pub fn set_user(&self, user: Option<Id>) {
        self.lock().user = user;
    }

    pub fn snapshot(&self) -> SessionRecord {
        self.lock().clone()
    }
}

/// Cookie-backed session layer. Records live in process memory.
pub fn session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(config.cookie_name.clone())
        .with_secure(config.secure_cookie)
}

/// Read the record for this client; a new client starts anonymous
pub async fn load_record(session: &Session) -> Result<SessionRecord, ApiError> {
    Ok(session.get::<SessionRecord>(SESSION_KEY).await?.unwrap_or_default())
}

/// Persist `updated` if it differs from `original`
pub async fn store_record(session: &Session, original: &SessionRecord, updated: &SessionRecord) -> Result<(), ApiError> {
    if original == updated {
        return Ok(());
    }
    // New identity on login so a pre-login cookie cannot be reused
    if original.user.is_none() && updated.user.is_some() {
        session.cycle_id().await?;
    }
    session.insert(SESSION_KEY, updated).await?;
    tracing::debug!("Session record updated (logged in: {})", updated.user.is_some());
    Ok(())
}
