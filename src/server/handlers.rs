//! Default action handlers
//!
//! Each handler runs one model operation and then either writes the response
//! itself or, in pass-control mode, stores the outcome in the request's
//! [`ResultEnvelope`] and hands control to the after-hooks.
//!
//! | action | model call | success body |
//! |---|---|---|
//! | list | `find(conditions, projection)` | `{"payload": [..]}` |
//! | create | `insert(body)` | `{"payload": {..}}` |
//! | read | `find_by_id(id, projection)` | `{"payload": {..} \| null}` |
//! | update | `find_by_id(id)`, merge, `save` | `{"payload": {..} \| null}` |
//! | delete | `delete_one(conditions)` | `{}` |
//! | deleteAll | `delete_many(conditions)` | `{}` |

use crate::core::{
    Action, Document, Flow, Middleware, Model, Projection, RequestContext, ResultEnvelope,
    SharedMiddleware, StorageResult, Whitelist,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::Arc;

/// State shared by the six default handlers of one router
pub struct HandlerContext {
    pub model: Arc<dyn Model>,
    pub identifying_key: String,
    pub projection: Option<Projection>,
    pub whitelist: Option<Whitelist>,
}

/// The generated handler for one action
pub struct DefaultHandler {
    action: Action,
    pass_control: bool,
    shared: Arc<HandlerContext>,
}

impl DefaultHandler {
    pub fn new(action: Action, pass_control: bool, shared: Arc<HandlerContext>) -> Self {
        Self {
            action,
            pass_control,
            shared,
        }
    }

    fn id<'a>(&self, ctx: &'a RequestContext) -> &'a str {
        ctx.param(&self.shared.identifying_key).unwrap_or_default()
    }

    /// The request body after whitelisting, or the response to send instead
    fn body(&self, ctx: &RequestContext) -> Result<Document, Flow> {
        let record = ctx.body_record();

        let Some(whitelist) = &self.shared.whitelist else {
            return Ok(record);
        };

        let result = whitelist.apply(&record);
        match result.sanitised {
            Some(sanitised) if !result.has_error => Ok(sanitised),
            _ => {
                tracing::debug!(
                    action = %self.action,
                    required = ?result.errors.required,
                    "request body failed whitelist"
                );
                Err(Flow::json(json!({ "error": result.errors })))
            }
        }
    }

    /// Deliver an outcome
    ///
    /// `Ok(None)` is a success without payload (deletes).
    fn finish(&self, mut ctx: RequestContext, outcome: StorageResult<Option<Value>>) -> Flow {
        if let Err(err) = &outcome {
            tracing::warn!(action = %self.action, error = %err, "model operation failed");
        }

        if self.pass_control {
            let envelope = match outcome {
                Ok(payload) => ResultEnvelope {
                    error: None,
                    payload,
                },
                Err(err) => ResultEnvelope::err(err),
            };
            ctx.set_envelope(envelope);
            return Flow::Next(ctx);
        }

        match outcome {
            Ok(Some(payload)) => Flow::json(json!({ "payload": payload })),
            Ok(None) => Flow::json(json!({})),
            Err(err) => Flow::json(json!({ "error": err })),
        }
    }

    async fn list(&self, ctx: RequestContext) -> Flow {
        let outcome = self
            .shared
            .model
            .find(&ctx.conditions(), self.shared.projection.as_ref())
            .await
            .map(|docs| Some(Value::Array(docs.into_iter().map(Value::Object).collect())));

        self.finish(ctx, outcome)
    }

    async fn create(&self, ctx: RequestContext) -> Flow {
        let body = match self.body(&ctx) {
            Ok(body) => body,
            Err(flow) => return flow,
        };

        let outcome = self
            .shared
            .model
            .insert(body)
            .await
            .map(|doc| Some(Value::Object(doc)));

        self.finish(ctx, outcome)
    }

    async fn read(&self, ctx: RequestContext) -> Flow {
        let outcome = self
            .shared
            .model
            .find_by_id(self.id(&ctx), self.shared.projection.as_ref())
            .await
            .map(|doc| Some(doc.map(Value::Object).unwrap_or(Value::Null)));

        self.finish(ctx, outcome)
    }

    async fn update(&self, ctx: RequestContext) -> Flow {
        let body = match self.body(&ctx) {
            Ok(body) => body,
            Err(flow) => return flow,
        };

        let model = &self.shared.model;
        let mut doc = match model.find_by_id(self.id(&ctx), None).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return self.finish(ctx, Ok(Some(Value::Null))),
            Err(err) => return self.finish(ctx, Err(err)),
        };

        // The record named in the path keeps its id
        doc.extend(
            body.into_iter()
                .filter(|(key, _)| key != &self.shared.identifying_key && key != model.id_key()),
        );
        let outcome = model.save(doc).await.map(|doc| Some(Value::Object(doc)));

        self.finish(ctx, outcome)
    }

    async fn delete(&self, ctx: RequestContext) -> Flow {
        let outcome = self
            .shared
            .model
            .delete_one(&ctx.conditions())
            .await
            .map(|()| None);

        self.finish(ctx, outcome)
    }

    async fn delete_all(&self, ctx: RequestContext) -> Flow {
        let outcome = self
            .shared
            .model
            .delete_many(&ctx.conditions())
            .await
            .map(|()| None);

        self.finish(ctx, outcome)
    }
}

#[async_trait]
impl Middleware for DefaultHandler {
    async fn handle(&self, ctx: RequestContext) -> Flow {
        match self.action {
            Action::List => self.list(ctx).await,
            Action::Create => self.create(ctx).await,
            Action::Read => self.read(ctx).await,
            Action::Update => self.update(ctx).await,
            Action::Delete => self.delete(ctx).await,
            Action::DeleteAll => self.delete_all(ctx).await,
        }
    }
}

/// Build the six default handlers
///
/// `pass_control` decides, per action, whether the outcome is handed to the
/// after-hooks.
pub fn default_handlers(
    shared: Arc<HandlerContext>,
    pass_control: impl Fn(Action) -> bool,
) -> IndexMap<Action, SharedMiddleware> {
    Action::ALL
        .into_iter()
        .map(|action| {
            let handler: SharedMiddleware = Arc::new(DefaultHandler::new(
                action,
                pass_control(action),
                shared.clone(),
            ));
            (action, handler)
        })
        .collect()
}
