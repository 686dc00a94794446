//! # Crudify
//!
//! Generate RESTful CRUD routers for document models on top of axum.
//!
//! ## Features
//!
//! - **Six Actions**: list, create, read, update, delete and deleteAll mapped to verbs and paths
//! - **Hooks**: Before and after middlewares per action, filtered with `only` / `except`
//! - **Result Passing**: Handlers can hand their result to after-hooks instead of responding
//! - **Overrides**: Suppress actions or replace their handlers while keeping the hooks
//! - **Body Whitelisting**: Keep listed keys and reject blank required ones
//! - **Configuration-Based**: Load the declarative settings from YAML
//!
//! ## Quick Start
//!
//! ```rust
//! use crudify::prelude::*;
//!
//! let require_user = from_fn(|ctx: RequestContext| async move {
//!     match ctx.header("x-username") {
//!         Some(_) => Flow::Next(ctx),
//!         None => Flow::respond(StatusCode::UNAUTHORIZED),
//!     }
//! });
//!
//! let articles = CrudBuilder::new()
//!     .with_model(InMemoryModel::new().with_default("views", 0.into()))
//!     .sanitise_body("+title,body")
//!     .select_fields("-secret")
//!     .before(HookDeclaration::new(vec![require_user]).except([Action::List, Action::Read]))
//!     .build()?;
//!
//! let app: Router = articles.mount("/articles");
//! # Ok::<(), ConfigError>(())
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

pub use server::builder::crudify;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Action, Chain, Conditions, ConfigError, CrudError, Document, Flow, HookDeclaration,
        HookPhase, HookRegistry, Middleware, Model, Projection, RequestContext, ResultEnvelope,
        SanitiseErrors, SharedMiddleware, StorageError, StorageResult, Whitelist, from_fn,
        sanitise,
    };

    // === Storage ===
    pub use crate::storage::InMemoryModel;

    // === Config ===
    pub use crate::config::{CrudSettings, RouterOptions, SanitiseBody};

    // === Server ===
    pub use crate::server::{CrudBuilder, CrudConfig, Crudified, Overrides, RouteEntry, crudify};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{Router, http::StatusCode};
}
