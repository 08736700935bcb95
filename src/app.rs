use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::concepts::{
    AuthenticatingConcept, CollectioningConcept, ConceptError, FriendingConcept, LevelingConcept, PostingConcept,
    SessioningConcept, SummarizingConcept, TrackeringConcept,
};
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::session_layer;
use crate::router::{Call, Dispatcher, Registry, RegistryError};
use crate::types::{Id, Role};

/// Every concept instance, each bound to its own collection
pub struct App {
    pub db: DatabaseManager,
    pub sessioning: SessioningConcept,
    pub authing: AuthenticatingConcept,
    pub posting: PostingConcept,
    pub friending: FriendingConcept,
    pub trackering: TrackeringConcept,
    pub collectioning: CollectioningConcept,
    pub summarizing: SummarizingConcept,
    pub leveling: LevelingConcept,
}

impl App {
    pub fn new(db: DatabaseManager) -> Result<Self, DatabaseError> {
        Ok(Self {
            sessioning: SessioningConcept,
            authing: AuthenticatingConcept::new(&db, "users")?,
            posting: PostingConcept::new(&db, "posts")?,
            friending: FriendingConcept::new(&db, "friends", "friend_requests")?,
            trackering: TrackeringConcept::new(&db, "trackers")?,
            collectioning: CollectioningConcept::new(&db, "collections")?,
            summarizing: SummarizingConcept::new(&db, "summaries")?,
            leveling: LevelingConcept::new(&db, "levels")?,
            db,
        })
    }

    /// The logged-in user of the call's session
    pub fn current_user(&self, call: &Call) -> Result<Id, ApiError> {
        Ok(self.sessioning.get_user(call.session()?)?)
    }

    pub async fn require_role(&self, user: Id, role: Role) -> Result<(), ApiError> {
        if self.authing.get_user_role(user).await? != role {
            return Err(ConceptError::not_allowed(format!("Only a {} can do this!", role)).into());
        }
        Ok(())
    }

    /// Resolve a username input to the user's id
    pub async fn user_id(&self, username: &str) -> Result<Id, ApiError> {
        Ok(self.authing.get_user_by_username(username).await?.id)
    }
}

pub fn build_registry() -> Result<Registry<App>, RegistryError> {
    let mut registry = Registry::new();
    handlers::register_all(&mut registry)?;
    Ok(registry)
}

/// The full HTTP application: service routes, registered actions, sessions and the
/// configured cross-cutting layers
pub fn router(config: &AppConfig, db: DatabaseManager) -> anyhow::Result<Router> {
    let registry = build_registry().context("registering actions")?;
    tracing::info!("Registered {} actions under '{}'", registry.len(), config.api.base_path);

    let app = Arc::new(App::new(db.clone()).context("opening concept collections")?);
    let actions = Dispatcher::new(registry, app, &config.api.base_path, config.api.max_request_size_bytes);

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(db)
        .merge(actions.into_router())
        .layer(session_layer(&config.session));

    if config.api.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    Ok(router)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Posts, friendships, habit trackers, collections and progress over composable concepts",
    }))
}

async fn health(State(db): State<DatabaseManager>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    match db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "storage": db.backend_name(),
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "storage": db.backend_name(),
                    "error": e.to_string(),
                })),
            )
        }
    }
}
