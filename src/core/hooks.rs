//! Before/after hook declarations and the per-action hook registry

use crate::core::action::Action;
use crate::core::middleware::SharedMiddleware;
use indexmap::IndexMap;
use std::fmt;

/// Where a hook runs relative to the action handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => f.write_str("before"),
            HookPhase::After => f.write_str("after"),
        }
    }
}

/// A group of middlewares and the actions they apply to
///
/// `only` wins over `except` when both are set. Without either filter the
/// middlewares apply to every action.
#[derive(Clone, Default)]
pub struct HookDeclaration {
    pub middlewares: Vec<SharedMiddleware>,
    pub only: Option<Vec<Action>>,
    pub except: Option<Vec<Action>>,
}

impl HookDeclaration {
    pub fn new(middlewares: Vec<SharedMiddleware>) -> Self {
        Self {
            middlewares,
            only: None,
            except: None,
        }
    }

    pub fn only(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.only = Some(actions.into_iter().collect());
        self
    }

    pub fn except(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.except = Some(actions.into_iter().collect());
        self
    }

    /// Actions this declaration targets, out of `all_actions`
    pub fn applicable(&self, all_actions: &[Action]) -> Vec<Action> {
        if let Some(only) = &self.only {
            return only.clone();
        }

        match &self.except {
            Some(except) => all_actions
                .iter()
                .copied()
                .filter(|action| !except.contains(action))
                .collect(),
            None => all_actions.to_vec(),
        }
    }
}

impl fmt::Debug for HookDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDeclaration")
            .field("middlewares", &self.middlewares.len())
            .field("only", &self.only)
            .field("except", &self.except)
            .finish()
    }
}

/// Ordered middlewares per action, for one phase
pub type PhaseHooks = IndexMap<Action, Vec<SharedMiddleware>>;

/// Hooks for both phases
#[derive(Clone, Default)]
pub struct HookRegistry {
    before: Option<PhaseHooks>,
    after: Option<PhaseHooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, phase: HookPhase) -> Option<&PhaseHooks> {
        match phase {
            HookPhase::Before => self.before.as_ref(),
            HookPhase::After => self.after.as_ref(),
        }
    }

    fn phase_slot(&mut self, phase: HookPhase) -> &mut Option<PhaseHooks> {
        match phase {
            HookPhase::Before => &mut self.before,
            HookPhase::After => &mut self.after,
        }
    }

    /// Middlewares registered for an action, empty if none
    pub fn get(&self, phase: HookPhase, action: Action) -> &[SharedMiddleware] {
        self.phase(phase)
            .and_then(|hooks| hooks.get(&action))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn before(&self, action: Action) -> &[SharedMiddleware] {
        self.get(HookPhase::Before, action)
    }

    pub fn after(&self, action: Action) -> &[SharedMiddleware] {
        self.get(HookPhase::After, action)
    }

    pub fn has_after(&self, action: Action) -> bool {
        !self.after(action).is_empty()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |hooks: &Option<PhaseHooks>| {
            hooks.as_ref().map(|hooks| {
                hooks
                    .iter()
                    .map(|(action, list)| (*action, list.len()))
                    .collect::<Vec<_>>()
            })
        };
        f.debug_struct("HookRegistry")
            .field("before", &counts(&self.before))
            .field("after", &counts(&self.after))
            .finish()
    }
}

/// Fold `declarations` into `registry` for one phase
///
/// The phase map is created with an empty list per action in `all_actions` if
/// it does not exist yet. Each applicable action gets the declaration's
/// middlewares appended. Actions without a slot in the phase map are skipped.
pub fn build_hooks(
    registry: &mut HookRegistry,
    phase: HookPhase,
    declarations: &[HookDeclaration],
    all_actions: &[Action],
) {
    let hooks = registry.phase_slot(phase).get_or_insert_with(|| {
        all_actions
            .iter()
            .map(|action| (*action, Vec::new()))
            .collect()
    });

    for declaration in declarations {
        for action in declaration.applicable(all_actions) {
            match hooks.get_mut(&action) {
                Some(list) => list.extend(declaration.middlewares.iter().cloned()),
                None => tracing::debug!(%phase, %action, "ignoring hook for unregistered action"),
            }
        }
    }
}
