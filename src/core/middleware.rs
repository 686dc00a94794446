//! Middleware chain primitives
//!
//! Every generated route runs a chain of [`Middleware`] steps: the before-hooks,
//! the action handler, then the after-hooks. A [`RequestContext`] is moved
//! from step to step. Each step either passes it on with [`Flow::Next`] or
//! finishes the request with [`Flow::Respond`]; later steps then never run.
//!
//! ```rust
//! use crudify::core::middleware::{Flow, from_fn};
//! use axum::http::StatusCode;
//!
//! let ensure_login = from_fn(|ctx| async move {
//!     if ctx.header("x-username") == Some("ryo") {
//!         Flow::Next(ctx)
//!     } else {
//!         Flow::respond(StatusCode::UNAUTHORIZED)
//!     }
//! });
//! # let _ = ensure_login;
//! ```

use crate::core::action::Action;
use crate::core::error::CrudError;
use async_trait::async_trait;
use axum::Json;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Outcome of an action, handed from a default handler to its after-hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CrudError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ResultEnvelope {
    pub fn ok(payload: Value) -> Self {
        Self {
            error: None,
            payload: Some(payload),
        }
    }

    pub fn err(error: impl Into<CrudError>) -> Self {
        Self {
            error: Some(error.into()),
            payload: None,
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

impl IntoResponse for ResultEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Per-request state threaded through a chain
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub action: Action,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path parameters captured by the route
    pub params: IndexMap<String, String>,
    /// Query-string parameters
    pub query: IndexMap<String, String>,
    /// Parsed JSON body, `Value::Null` when the request had none
    pub body: Value,
    envelope: Option<ResultEnvelope>,
}

impl RequestContext {
    pub fn new(action: Action, uri: Uri) -> Self {
        Self {
            action,
            method: action.verb(),
            uri,
            headers: HeaderMap::new(),
            params: IndexMap::new(),
            query: IndexMap::new(),
            body: Value::Null,
            envelope: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Header value as UTF-8, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Path parameters overlaid by query parameters
    pub fn conditions(&self) -> Map<String, Value> {
        self.params
            .iter()
            .chain(self.query.iter())
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    /// The body as a record; anything but a JSON object reads as empty
    pub fn body_record(&self) -> Map<String, Value> {
        match &self.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn envelope(&self) -> Option<&ResultEnvelope> {
        self.envelope.as_ref()
    }

    pub fn envelope_mut(&mut self) -> Option<&mut ResultEnvelope> {
        self.envelope.as_mut()
    }

    pub fn set_envelope(&mut self, envelope: ResultEnvelope) {
        self.envelope = Some(envelope);
    }

    pub fn take_envelope(&mut self) -> Option<ResultEnvelope> {
        self.envelope.take()
    }
}

/// What a middleware step decided
pub enum Flow {
    /// Hand the context to the next step
    Next(RequestContext),
    /// Finish the request
    Respond(Response),
}

impl Flow {
    pub fn respond(response: impl IntoResponse) -> Self {
        Flow::Respond(response.into_response())
    }

    /// Respond with a JSON body
    pub fn json(body: Value) -> Self {
        Flow::Respond(Json(body).into_response())
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::Next(ctx) => f.debug_tuple("Next").field(&ctx.action).finish(),
            Flow::Respond(res) => f.debug_tuple("Respond").field(&res.status()).finish(),
        }
    }
}

/// A step in a route's chain
///
/// Hooks and action handlers share this shape, so any hook can stand in for
/// a handler and the other way round.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: RequestContext) -> Flow;
}

pub type SharedMiddleware = Arc<dyn Middleware>;

/// Middleware backed by an async closure, see [`from_fn`]
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Flow> + Send,
{
    async fn handle(&self, ctx: RequestContext) -> Flow {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a shared middleware
pub fn from_fn<F, Fut>(f: F) -> SharedMiddleware
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// The ordered steps registered for one route
#[derive(Clone)]
pub struct Chain {
    action: Action,
    steps: Vec<SharedMiddleware>,
}

impl Chain {
    pub fn new(action: Action, steps: Vec<SharedMiddleware>) -> Self {
        Self { action, steps }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order until one responds
    ///
    /// A chain where every step passes control answers `404 Not Found`.
    pub async fn run(&self, mut ctx: RequestContext) -> Response {
        for (index, step) in self.steps.iter().enumerate() {
            match step.handle(ctx).await {
                Flow::Next(next) => ctx = next,
                Flow::Respond(response) => {
                    tracing::debug!(
                        action = %self.action,
                        step = index,
                        status = %response.status(),
                        "chain responded"
                    );
                    return response;
                }
            }
        }

        tracing::warn!(
            action = %self.action,
            steps = self.steps.len(),
            "no middleware wrote a response"
        );
        StatusCode::NOT_FOUND.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageError;
    use serde_json::json;
    use std::sync::Mutex;

    fn ctx() -> RequestContext {
        RequestContext::new(Action::Read, Uri::from_static("/articles/1"))
    }

    fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SharedMiddleware {
        from_fn(move |ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name);
                Flow::Next(ctx)
            }
        })
    }

    #[test]
    fn test_conditions_query_overrides_params() {
        let ctx = ctx()
            .with_param("_id", "1")
            .with_param("owner", "a")
            .with_query("owner", "b")
            .with_query("tag", "x");

        assert_eq!(
            Value::Object(ctx.conditions()),
            json!({ "_id": "1", "owner": "b", "tag": "x" })
        );
    }

    #[test]
    fn test_body_record_ignores_non_objects() {
        assert!(ctx().with_body(json!([1, 2])).body_record().is_empty());
        assert_eq!(
            ctx().with_body(json!({ "a": 1 })).body_record().len(),
            1
        );
    }

    #[test]
    fn test_envelope_serialization_skips_missing_halves() {
        let ok = serde_json::to_value(ResultEnvelope::ok(json!([]))).unwrap();
        assert_eq!(ok, json!({ "payload": [] }));

        let err = serde_json::to_value(ResultEnvelope::err(StorageError::Backend {
            message: "down".to_string(),
        }))
        .unwrap();
        assert_eq!(err["error"]["code"], "STORAGE_ERROR");
        assert!(err.get("payload").is_none());
    }

    #[test]
    fn test_from_fn_runs_closure() {
        let mw = from_fn(|mut ctx: RequestContext| async move {
            ctx.set_envelope(ResultEnvelope::ok(json!("seen")));
            Flow::Next(ctx)
        });

        match tokio_test::block_on(mw.handle(ctx())) {
            Flow::Next(ctx) => {
                assert_eq!(ctx.envelope().unwrap().payload, Some(json!("seen")))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_and_stops_on_response() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(
            Action::Read,
            vec![
                recorder(log.clone(), "first"),
                recorder(log.clone(), "second"),
                from_fn(|_| async { Flow::respond(StatusCode::UNAUTHORIZED) }),
                recorder(log.clone(), "never"),
            ],
        );

        let response = chain.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_not_found() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(Action::Read, vec![recorder(log.clone(), "only")]);

        let response = chain.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
