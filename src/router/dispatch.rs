use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tower_sessions::Session;

use crate::error::ApiError;
use crate::middleware::{load_record, store_record, SessionHandle};
use crate::router::call::{parse_body, parse_query, reads_query, reconcile, Call};
use crate::router::registry::{Registry, Resolution, Route};

/// Shared, immutable dispatch state: the action table plus the state every handler receives
pub struct Dispatcher<S> {
    registry: Registry<S>,
    state: Arc<S>,
    base_path: String,
    max_body_bytes: usize,
}

impl<S: Send + Sync + 'static> Dispatcher<S> {
    pub fn new(registry: Registry<S>, state: Arc<S>, base_path: &str, max_body_bytes: usize) -> Self {
        Self {
            registry,
            state,
            base_path: crate::config::normalize_base_path(base_path),
            max_body_bytes,
        }
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Router whose fallback dispatches every unmatched request through the registry
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch::<S>).with_state(Arc::new(self))
    }

    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base_path.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    async fn run(&self, session: Option<Session>, request: Request) -> Result<Response, ApiError> {
        let (parts, body) = request.into_parts();
        let path = self
            .strip_base(parts.uri.path())
            .ok_or_else(|| ApiError::not_found(format!("No action for {}", parts.uri.path())))?;

        let (route, path_params) = match self.registry.resolve(&parts.method, path) {
            Resolution::Found(route, params) => (route, params),
            Resolution::MethodNotAllowed(allow) => return Err(ApiError::method_not_allowed(allow)),
            Resolution::NotFound => {
                return Err(ApiError::not_found(format!("No action for {} {}", parts.method, path)))
            }
        };
        tracing::debug!("Dispatching {} {} to {}", parts.method, path, route.template.as_str());

        let inputs = if reads_query(&parts.method) {
            parse_query(parts.uri.query())
        } else {
            parse_body(&self.read_body(body).await?)?
        };

        let session = match (route.handler.takes_session(), session) {
            (false, _) => None,
            (true, Some(session)) => Some(session),
            (true, None) => return Err(ApiError::internal_server_error("Session layer is not installed")),
        };

        let record = match &session {
            Some(session) => Some(load_record(session).await?),
            None => None,
        };
        let handle = record.clone().map(SessionHandle::new);

        let result = self.invoke(route, path_params, inputs, handle.clone()).await;

        // Session changes persist even when the handler then fails
        if let (Some(session), Some(original), Some(handle)) = (&session, &record, &handle) {
            store_record(session, original, &handle.snapshot()).await?;
        }

        let value = result?;
        Ok((StatusCode::OK, Json(value)).into_response())
    }

    async fn invoke(
        &self,
        route: &Route<S>,
        path_params: Vec<(String, String)>,
        inputs: serde_json::Map<String, serde_json::Value>,
        session: Option<SessionHandle>,
    ) -> Result<serde_json::Value, ApiError> {
        let mut declared = route.handler.declared().to_vec();
        declared.retain(|p| !route.template.params().any(|name| name == p.name));
        let args = reconcile(path_params, inputs, &declared)?;

        if let Some(schema) = &route.schema {
            schema
                .validate(&args)
                .map_err(|violations| ApiError::validation_error("Invalid request parameters", violations))?;
        }

        (route.handler.func)(self.state.clone(), Call::new(args, session)).await
    }

    async fn read_body(&self, body: Body) -> Result<axum::body::Bytes, ApiError> {
        to_bytes(body, self.max_body_bytes).await.map_err(|e| {
            tracing::debug!("Rejected request body: {}", e);
            ApiError::PayloadTooLarge(format!("Request body exceeds {} bytes", self.max_body_bytes))
        })
    }
}

async fn dispatch<S: Send + Sync + 'static>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    session: Option<Session>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match dispatcher.run(session, request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!("{} {} failed: {} ({:?})", method, path, err, err);
            } else {
                tracing::debug!("{} {} rejected: {} {}", method, path, err.status_code(), err);
            }
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::handler::handler;
    use crate::validation::{Rule, Schema};
    use axum::http::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    fn router() -> (Router, Arc<Counter>) {
        let state = Arc::new(Counter::default());
        let mut registry = Registry::new();
        registry
            .register(
                Method::PATCH,
                "/trackers/:title/check",
                handler(|s: Arc<Counter>, call: Call| async move {
                    s.hits.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(json!({ "title": call.string("title")?, "day": call.integer("day")? }))
                })
                .params(&["day"]),
                Some(Schema::new().required("day", Rule::integer().range(0.0, 364.0))),
            )
            .unwrap()
            .register(
                Method::GET,
                "/echo",
                handler(|_: Arc<Counter>, call: Call| async move { Ok::<_, ApiError>(Value::Object(call.args().clone())) })
                    .optional(&["q"]),
                None,
            )
            .unwrap();
        let router = Dispatcher::new(registry, state.clone(), "/api", 1024).into_router();
        (router, state)
    }

    async fn send(router: Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn failed_validation_never_runs_the_handler() {
        let (router, state) = router();
        let (status, body) = send(router, Method::PATCH, "/api/trackers/run/check", r#"{"day": 400}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(state.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_request_binds_path_and_body() {
        let (router, state) = router();
        let (status, body) = send(router, Method::PATCH, "/api/trackers/run/check", r#"{"day": "3"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"title": "run", "day": 3}));
        assert_eq!(state.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_the_handler() {
        let (router, state) = router();
        let (status, body) = send(router, Method::PATCH, "/api/trackers/run/check", "{nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_JSON");
        assert_eq!(state.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_reads_the_query_and_drops_undeclared_inputs() {
        let (router, _) = router();
        let (status, body) = send(router, Method::GET, "/api/echo?q=hello&other=1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"q": "hello"}));
    }

    #[tokio::test]
    async fn unknown_paths_and_methods() {
        let (router, _) = router();
        let (status, _) = send(router.clone(), Method::GET, "/api/nothing", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(router.clone(), Method::POST, "/api/echo", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = send(router, Method::GET, "/echo", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let (router, state) = router();
        let big = format!(r#"{{"day": 1, "pad": "{}"}}"#, "x".repeat(2048));
        let (status, _) = send(router, Method::PATCH, "/api/trackers/run/check", &big).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(state.hits.load(Ordering::SeqCst), 0);
    }
}
