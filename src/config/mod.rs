//! Serializable settings for a generated router
//!
//! Everything about a router that is not code (the model, hooks and
//! replacement handlers) can be described in YAML:
//!
//! ```yaml
//! identifying_key: _id
//! select_fields: "-secret"
//! sanitise_body:
//!   whitelist_keys: "+title,body"
//! handle_result_for: [create]
//! suppress: [deleteAll]
//! router:
//!   strict: true
//! ```

use crate::core::{Action, ConfigError};
use serde::{Deserialize, Serialize};

/// Whitelist applied to create and update bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitiseBody {
    /// Keys separated by commas or spaces, `+` marks a key required
    pub whitelist_keys: String,
}

impl SanitiseBody {
    pub fn new(whitelist_keys: impl Into<String>) -> Self {
        Self {
            whitelist_keys: whitelist_keys.into(),
        }
    }
}

/// Route matching options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Generated paths have no literal segments, so this never changes
    /// matching; kept so settings round-trip.
    pub case_sensitive: bool,
    /// When false, item routes also answer with a trailing slash
    pub strict: bool,
    /// When true, path parameters captured by an enclosing router become
    /// query conditions too
    pub merge_params: bool,
}

fn default_identifying_key() -> String {
    "_id".to_string()
}

/// The declarative part of a router's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudSettings {
    #[serde(default = "default_identifying_key")]
    pub identifying_key: String,

    /// Actions that always hand their result to after-hooks
    #[serde(default)]
    pub handle_result_for: Vec<Action>,

    /// Actions to leave unregistered
    #[serde(default)]
    pub suppress: Vec<Action>,

    /// Field selection passed to list and read queries
    #[serde(default)]
    pub select_fields: Option<String>,

    #[serde(default)]
    pub sanitise_body: Option<SanitiseBody>,

    #[serde(default)]
    pub router: RouterOptions,
}

impl Default for CrudSettings {
    fn default() -> Self {
        Self {
            identifying_key: default_identifying_key(),
            handle_result_for: Vec::new(),
            suppress: Vec::new(),
            select_fields: None,
            sanitise_body: None,
            router: RouterOptions::default(),
        }
    }
}

impl CrudSettings {
    /// Load settings from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
