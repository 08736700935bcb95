use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::ApiError;
use crate::router::call::Call;

pub type HandlerFuture = BoxFuture<'static, Result<Value, ApiError>>;
pub type HandlerFn<S> = Arc<dyn Fn(Arc<S>, Call) -> HandlerFuture + Send + Sync>;

/// A named input the handler expects besides path parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub required: bool,
}

/// Type-erased action handler plus its declared inputs
pub struct Handler<S> {
    pub(crate) func: HandlerFn<S>,
    pub(crate) params: Vec<Param>,
    pub(crate) session: bool,
}

impl<S> Handler<S> {
    /// The handler receives the caller's session
    pub fn with_session(mut self) -> Self {
        self.session = true;
        self
    }

    /// Required inputs
    pub fn params(mut self, names: &[&str]) -> Self {
        self.declare(names, true);
        self
    }

    /// Optional inputs
    pub fn optional(mut self, names: &[&str]) -> Self {
        self.declare(names, false);
        self
    }

    fn declare(&mut self, names: &[&str], required: bool) {
        for name in names {
            self.params.retain(|p| p.name != *name);
            self.params.push(Param { name: name.to_string(), required });
        }
    }

    pub fn declared(&self) -> &[Param] {
        &self.params
    }

    pub fn takes_session(&self) -> bool {
        self.session
    }
}

/// Wrap an async function into a handler. Its success value is serialized as the response body.
pub fn handler<S, F, Fut, R, E>(f: F) -> Handler<S>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, Call) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let func: HandlerFn<S> = Arc::new(move |state, call| {
        let fut = f(state, call);
        Box::pin(async move {
            let value = fut.await.map_err(Into::<ApiError>::into)?;
            Ok::<Value, ApiError>(serde_json::to_value(value)?)
        })
    });

    Handler {
        func,
        params: Vec::new(),
        session: false,
    }
}
