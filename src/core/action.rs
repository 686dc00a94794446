//! The six REST actions and their route table

use crate::core::error::ConfigError;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the conventional REST operations on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// `GET /`
    List,
    /// `POST /`
    Create,
    /// `GET /{id}`
    Read,
    /// `PUT /{id}`
    Update,
    /// `DELETE /{id}`
    Delete,
    /// `DELETE /`
    DeleteAll,
}

impl Action {
    /// Every action, in registration order
    pub const ALL: [Action; 6] = [
        Action::List,
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::DeleteAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::DeleteAll => "deleteAll",
        }
    }

    pub fn verb(&self) -> Method {
        match self {
            Action::List | Action::Read => Method::GET,
            Action::Create => Method::POST,
            Action::Update => Method::PUT,
            Action::Delete | Action::DeleteAll => Method::DELETE,
        }
    }

    /// Whether the route carries the identifying path parameter
    pub fn needs_param(&self) -> bool {
        matches!(self, Action::Read | Action::Update | Action::Delete)
    }

    /// Route path for this action, relative to the collection root
    ///
    /// Uses axum's `{param}` capture syntax.
    pub fn path(&self, identifying_key: &str) -> String {
        if self.needs_param() {
            format!("/{{{identifying_key}}}")
        } else {
            "/".to_string()
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        let table: Vec<_> = Action::ALL
            .iter()
            .map(|a| (a.as_str(), a.verb(), a.path("_id")))
            .collect();

        assert_eq!(
            table,
            vec![
                ("list", Method::GET, "/".to_string()),
                ("create", Method::POST, "/".to_string()),
                ("read", Method::GET, "/{_id}".to_string()),
                ("update", Method::PUT, "/{_id}".to_string()),
                ("delete", Method::DELETE, "/{_id}".to_string()),
                ("deleteAll", Method::DELETE, "/".to_string()),
            ]
        );
    }

    #[test]
    fn test_path_uses_identifying_key() {
        assert_eq!(Action::Read.path("slug"), "/{slug}");
        assert_eq!(Action::List.path("slug"), "/");
    }

    #[test]
    fn test_parse_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!("deleteAll".parse::<Action>().unwrap(), Action::DeleteAll);
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = "destroy".parse::<Action>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAction { name } if name == "destroy"));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&Action::DeleteAll).unwrap(),
            "\"deleteAll\""
        );
        let action: Action = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(action, Action::Read);
    }
}
