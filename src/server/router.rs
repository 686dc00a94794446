//! Registration of action chains on an axum router

use crate::config::RouterOptions;
use crate::core::{Action, Chain, RequestContext, RequestError};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, RawPathParams};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::IntoResponse;
use axum::routing::{MethodFilter, MethodRouter, on};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// A route registered by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub action: Action,
    pub method: Method,
    pub path: String,
    /// Number of middlewares in the chain, handler included
    pub steps: usize,
}

/// Builds the router one action at a time
pub struct RouteRegistrar {
    router: Router,
    /// Collection actions answering the mount point with a trailing slash
    collection_slash: Option<MethodRouter>,
    entries: Vec<RouteEntry>,
    identifying_key: String,
    options: RouterOptions,
}

impl RouteRegistrar {
    pub fn new(identifying_key: impl Into<String>, options: RouterOptions) -> Self {
        Self {
            router: Router::new(),
            collection_slash: None,
            entries: Vec::new(),
            identifying_key: identifying_key.into(),
            options,
        }
    }

    /// Register `chain` under its action's verb and path
    pub fn register(&mut self, chain: Chain) {
        let action = chain.action();
        let method = action.verb();
        let path = action.path(&self.identifying_key);

        let Ok(filter) = MethodFilter::try_from(method.clone()) else {
            tracing::warn!(%action, %method, "router has no method filter for verb, skipping");
            return;
        };

        tracing::debug!(%action, %method, %path, steps = chain.len(), "registering route");

        self.entries.push(RouteEntry {
            action,
            method,
            path: path.clone(),
            steps: chain.len(),
        });

        let chain = Arc::new(chain);
        let own_params = self.own_params(action);
        let handler = move |method: Method,
                            uri: Uri,
                            headers: HeaderMap,
                            params: RawPathParams,
                            Query(query): Query<Vec<(String, String)>>,
                            body: Bytes| {
            let chain = chain.clone();
            let own_params = own_params.clone();
            async move {
                let body = match parse_body(&body) {
                    Ok(body) => body,
                    Err(err) => return err.into_response(),
                };

                let mut ctx = RequestContext::new(action, uri).with_headers(headers);
                ctx.method = method;
                ctx.body = body;
                ctx.params = params
                    .iter()
                    .filter(|(key, _)| {
                        own_params
                            .as_ref()
                            .is_none_or(|own| own.iter().any(|o| o.as_str() == *key))
                    })
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
                ctx.query = query.into_iter().collect::<IndexMap<_, _>>();

                chain.run(ctx).await
            }
        };

        let mut router = std::mem::take(&mut self.router).route(&path, on(filter, handler.clone()));
        if !self.options.strict {
            if action.needs_param() {
                router = router.route(&format!("{path}/"), on(filter, handler));
            } else {
                // A nested "/" only matches the bare prefix, so the slashed
                // form is routed by the parent, see `Crudified::mount`
                self.collection_slash = Some(match self.collection_slash.take() {
                    Some(methods) => methods.on(filter, handler),
                    None => on(filter, handler),
                });
            }
        }
        self.router = router;
    }

    /// Path parameters an action's chain may see, `None` meaning all of them
    fn own_params(&self, action: Action) -> Option<Vec<String>> {
        if self.options.merge_params {
            return None;
        }
        if action.needs_param() {
            Some(vec![self.identifying_key.clone()])
        } else {
            Some(Vec::new())
        }
    }

    pub fn finish(self) -> RegisteredRoutes {
        RegisteredRoutes {
            router: self.router,
            collection_slash: self.collection_slash,
            entries: self.entries,
        }
    }
}

/// What a [`RouteRegistrar`] produced
pub struct RegisteredRoutes {
    pub router: Router,
    /// Methods for `{prefix}/`, present unless routing is strict
    pub collection_slash: Option<MethodRouter>,
    pub entries: Vec<RouteEntry>,
}

/// Whether `key` can name a path parameter
pub fn is_valid_param_name(key: &str) -> bool {
    !key.is_empty() && !key.contains(['/', '{', '}', '*'])
}

fn parse_body(bytes: &Bytes) -> Result<Value, RequestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| RequestError::InvalidJson {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Flow, from_fn};

    fn chain(action: Action) -> Chain {
        Chain::new(action, vec![from_fn(|_| async { Flow::json(serde_json::json!({})) })])
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(&Bytes::new()).unwrap(), Value::Null);
        assert_eq!(parse_body(&Bytes::from_static(b" \n")).unwrap(), Value::Null);
        assert_eq!(
            parse_body(&Bytes::from_static(b"{\"a\":1}")).unwrap(),
            serde_json::json!({ "a": 1 })
        );
        assert!(parse_body(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn test_entries_follow_registration() {
        let mut registrar = RouteRegistrar::new("slug", RouterOptions::default());
        registrar.register(chain(Action::List));
        registrar.register(chain(Action::Update));

        let routes = registrar.finish();
        assert!(routes.collection_slash.is_some());
        assert_eq!(
            routes.entries,
            vec![
                RouteEntry {
                    action: Action::List,
                    method: Method::GET,
                    path: "/".to_string(),
                    steps: 1,
                },
                RouteEntry {
                    action: Action::Update,
                    method: Method::PUT,
                    path: "/{slug}".to_string(),
                    steps: 1,
                },
            ]
        );
    }

    #[test]
    fn test_strict_has_no_collection_slash() {
        let mut registrar = RouteRegistrar::new(
            "_id",
            RouterOptions {
                strict: true,
                ..RouterOptions::default()
            },
        );
        registrar.register(chain(Action::List));
        assert!(registrar.finish().collection_slash.is_none());
    }

    #[test]
    fn test_param_names() {
        assert!(is_valid_param_name("_id"));
        assert!(is_valid_param_name("slug"));
        for bad in ["", "a/b", "{id}", "id}", "*rest"] {
            assert!(!is_valid_param_name(bad), "{bad:?}");
        }
    }

    #[test]
    fn test_own_params() {
        let registrar = RouteRegistrar::new("_id", RouterOptions::default());
        assert_eq!(registrar.own_params(Action::Read), Some(vec!["_id".to_string()]));
        assert_eq!(registrar.own_params(Action::List), Some(vec![]));

        let merged = RouteRegistrar::new(
            "_id",
            RouterOptions {
                merge_params: true,
                ..RouterOptions::default()
            },
        );
        assert_eq!(merged.own_params(Action::Read), None);
    }
}
