//! CrudBuilder for fluent API to build CRUD routers

use super::handlers::{HandlerContext, default_handlers};
use super::router::{RouteEntry, RouteRegistrar, is_valid_param_name};
use crate::config::{CrudSettings, RouterOptions, SanitiseBody};
use crate::core::{
    Action, Chain, ConfigError, HookDeclaration, HookPhase, HookRegistry, Model, Projection,
    SharedMiddleware, Whitelist, build_hooks,
};
use axum::Router;
use axum::routing::MethodRouter;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// How configured handlers alter the default ones
#[derive(Clone)]
pub enum Overrides {
    /// Leave these actions unregistered: no route, no hooks
    Suppress(Vec<Action>),
    /// Use these handlers instead of the defaults
    ///
    /// Replacement handlers get no whitelisting and no result envelope;
    /// their hooks still run around them.
    Replace(IndexMap<Action, SharedMiddleware>),
}

impl Default for Overrides {
    fn default() -> Self {
        Overrides::Suppress(Vec::new())
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overrides::Suppress(actions) => f.debug_tuple("Suppress").field(actions).finish(),
            Overrides::Replace(handlers) => f
                .debug_tuple("Replace")
                .field(&handlers.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Everything needed to generate a router
#[derive(Clone)]
pub struct CrudConfig {
    pub model: Option<Arc<dyn Model>>,
    pub identifying_key: String,
    pub handle_result_for: Vec<Action>,
    pub overrides: Overrides,
    pub select_fields: Option<String>,
    pub sanitise_body: Option<SanitiseBody>,
    pub before_actions: Vec<HookDeclaration>,
    pub after_actions: Vec<HookDeclaration>,
    pub router: RouterOptions,
}

impl Default for CrudConfig {
    fn default() -> Self {
        CrudSettings::default().into()
    }
}

impl From<CrudSettings> for CrudConfig {
    fn from(settings: CrudSettings) -> Self {
        Self {
            model: None,
            identifying_key: settings.identifying_key,
            handle_result_for: settings.handle_result_for,
            overrides: Overrides::Suppress(settings.suppress),
            select_fields: settings.select_fields,
            sanitise_body: settings.sanitise_body,
            before_actions: Vec::new(),
            after_actions: Vec::new(),
            router: settings.router,
        }
    }
}

/// The output of a build
///
/// Besides the router, the handler set, the hook registry and the list of
/// registered routes are kept for inspection.
pub struct Crudified {
    pub handlers: IndexMap<Action, SharedMiddleware>,
    pub hooks: HookRegistry,
    pub routes: Vec<RouteEntry>,
    pub router: Router,
    collection_slash: Option<MethodRouter>,
}

impl Crudified {
    pub fn route(&self, action: Action) -> Option<&RouteEntry> {
        self.routes.iter().find(|route| route.action == action)
    }

    /// The generated routes alone, relative to wherever they get nested
    ///
    /// Collection actions then answer only the bare prefix; use
    /// [`mount`](Self::mount) to also serve `{prefix}/` when routing is not
    /// strict.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Nest the generated routes under `prefix`
    ///
    /// Unless routing is strict, list, create and deleteAll also answer
    /// `{prefix}/`. An empty or `/` prefix mounts at the root.
    pub fn mount(self, prefix: &str) -> Router {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return self.router;
        }

        let router = Router::new().nest(prefix, self.router);
        match self.collection_slash {
            Some(methods) => router.route(&format!("{prefix}/"), methods),
            None => router,
        }
    }
}

impl fmt::Debug for Crudified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crudified")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// Generate the CRUD router described by `config`
///
/// Fails when no model is configured or when the identifying key cannot
/// name a path parameter, before anything is built.
pub fn crudify(config: CrudConfig) -> Result<Crudified, ConfigError> {
    let model = config.model.ok_or(ConfigError::MissingModel)?;
    if !is_valid_param_name(&config.identifying_key) {
        return Err(ConfigError::InvalidIdentifyingKey {
            key: config.identifying_key,
        });
    }
    if model.id_key() != config.identifying_key {
        tracing::warn!(
            identifying_key = %config.identifying_key,
            model_id_key = model.id_key(),
            "identifying key differs from the model's id field, read and update look up by the model's id"
        );
    }

    let mut hooks = HookRegistry::new();
    build_hooks(
        &mut hooks,
        HookPhase::Before,
        &config.before_actions,
        &Action::ALL,
    );
    build_hooks(
        &mut hooks,
        HookPhase::After,
        &config.after_actions,
        &Action::ALL,
    );

    let shared = Arc::new(HandlerContext {
        model,
        identifying_key: config.identifying_key.clone(),
        projection: config.select_fields.as_deref().and_then(Projection::parse),
        whitelist: config
            .sanitise_body
            .as_ref()
            .map(|body| Whitelist::parse(&body.whitelist_keys))
            .filter(|whitelist| !whitelist.is_empty()),
    });

    let defaults = default_handlers(shared, |action| {
        config.handle_result_for.contains(&action) || hooks.has_after(action)
    });

    let (handlers, suppressed) = match config.overrides {
        Overrides::Suppress(actions) => (defaults, actions),
        Overrides::Replace(replacements) => {
            let mut handlers = defaults;
            for (action, handler) in replacements {
                tracing::debug!(%action, "replacing default handler");
                handlers.insert(action, handler);
            }
            (handlers, Vec::new())
        }
    };

    let mut registrar = RouteRegistrar::new(&config.identifying_key, config.router);
    for (action, handler) in &handlers {
        if suppressed.contains(action) {
            tracing::debug!(%action, "action suppressed, no route registered");
            continue;
        }

        let steps = hooks
            .before(*action)
            .iter()
            .cloned()
            .chain(std::iter::once(handler.clone()))
            .chain(hooks.after(*action).iter().cloned())
            .collect();
        registrar.register(Chain::new(*action, steps));
    }

    let registered = registrar.finish();
    let routes = registered.entries;
    tracing::info!(
        routes = routes.len(),
        identifying_key = %config.identifying_key,
        "crud router built"
    );

    Ok(Crudified {
        handlers,
        hooks,
        routes,
        router: registered.router,
        collection_slash: registered.collection_slash,
    })
}

/// Builder for creating CRUD routers
///
/// # Example
///
/// ```
/// use crudify::prelude::*;
///
/// let built = CrudBuilder::new()
///     .with_model(InMemoryModel::new())
///     .sanitise_body("+title,body")
///     .suppress([Action::DeleteAll])
///     .build()?;
///
/// let app: Router = built.mount("/articles");
/// # Ok::<(), ConfigError>(())
/// ```
#[derive(Default)]
pub struct CrudBuilder {
    config: CrudConfig,
}

impl CrudBuilder {
    /// Create a new CrudBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded settings
    pub fn from_settings(settings: CrudSettings) -> Self {
        Self {
            config: settings.into(),
        }
    }

    /// Set the data model (required)
    pub fn with_model(self, model: impl Model + 'static) -> Self {
        self.with_shared_model(Arc::new(model))
    }

    pub fn with_shared_model(mut self, model: Arc<dyn Model>) -> Self {
        self.config.model = Some(model);
        self
    }

    pub fn identifying_key(mut self, key: impl Into<String>) -> Self {
        self.config.identifying_key = key.into();
        self
    }

    /// Hand these actions' results to the after-hooks even when none are registered
    pub fn handle_result_for(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.config.handle_result_for = actions.into_iter().collect();
        self
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.config.overrides = overrides;
        self
    }

    /// Leave these actions unregistered
    ///
    /// Switches to [`Overrides::Suppress`], dropping any replacement handlers.
    pub fn suppress(self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.overrides(Overrides::Suppress(actions.into_iter().collect()))
    }

    /// Use `handler` instead of the default handler for `action`
    ///
    /// Switches to [`Overrides::Replace`], dropping any suppressed actions.
    pub fn replace(mut self, action: Action, handler: SharedMiddleware) -> Self {
        match &mut self.config.overrides {
            Overrides::Replace(handlers) => {
                handlers.insert(action, handler);
            }
            Overrides::Suppress(_) => {
                self.config.overrides = Overrides::Replace(IndexMap::from([(action, handler)]));
            }
        }
        self
    }

    pub fn select_fields(mut self, fields: impl Into<String>) -> Self {
        self.config.select_fields = Some(fields.into());
        self
    }

    pub fn sanitise_body(mut self, whitelist_keys: impl Into<String>) -> Self {
        self.config.sanitise_body = Some(SanitiseBody::new(whitelist_keys));
        self
    }

    pub fn before(mut self, declaration: HookDeclaration) -> Self {
        self.config.before_actions.push(declaration);
        self
    }

    pub fn after(mut self, declaration: HookDeclaration) -> Self {
        self.config.after_actions.push(declaration);
        self
    }

    pub fn router_options(mut self, options: RouterOptions) -> Self {
        self.config.router = options;
        self
    }

    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    /// Build the router
    pub fn build(self) -> Result<Crudified, ConfigError> {
        crudify(self.config)
    }
}
