//! Core module containing the building blocks of a generated router

pub mod action;
pub mod error;
pub mod hooks;
pub mod middleware;
pub mod model;
pub mod sanitise;

pub use action::Action;
pub use error::{ConfigError, CrudError, ErrorResponse, RequestError, StorageError, StorageResult};
pub use hooks::{HookDeclaration, HookPhase, HookRegistry, build_hooks};
pub use middleware::{
    Chain, Flow, Middleware, RequestContext, ResultEnvelope, SharedMiddleware, from_fn,
};
pub use model::{Conditions, Document, Model, Projection};
pub use sanitise::{SanitisationResult, SanitiseErrors, Whitelist, sanitise};
