//! Generation of CRUD routers
//!
//! [`crudify`] turns a [`CrudConfig`] into an axum [`Router`](axum::Router)
//! exposing six actions, each wired as a chain of before-hooks, a handler
//! and after-hooks.

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::{CrudBuilder, CrudConfig, Crudified, Overrides, crudify};
pub use handlers::{DefaultHandler, HandlerContext, default_handlers};
pub use router::{RouteEntry, RouteRegistrar};
