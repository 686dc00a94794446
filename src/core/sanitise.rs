//! Key-whitelist sanitisation of request bodies
//!
//! A whitelist is a string of key names separated by commas or spaces.
//! A leading `+` marks a key as required:
//!
//! ```rust
//! use crudify::core::sanitise::sanitise;
//! use serde_json::json;
//!
//! let body = json!({ "title": "Hello", "secret": "x", "views": 3 });
//! let result = sanitise(body.as_object().unwrap(), Some("+title,views"));
//!
//! assert!(!result.has_error);
//! assert_eq!(
//!     serde_json::Value::Object(result.sanitised.unwrap()),
//!     json!({ "title": "Hello", "views": 3 })
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that failed the whitelist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitiseErrors {
    /// Required keys that were missing or blank
    pub required: Vec<String>,
    /// Reserved for per-key type checks; nothing populates it yet
    pub invalid: Vec<String>,
}

impl SanitiseErrors {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.invalid.is_empty()
    }
}

/// Outcome of [`sanitise`]
#[derive(Debug, Clone, PartialEq)]
pub struct SanitisationResult {
    pub has_error: bool,
    pub errors: SanitiseErrors,
    /// The filtered record, `None` when `has_error` is set
    pub sanitised: Option<Map<String, Value>>,
}

/// A parsed whitelist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    required: Vec<String>,
    optional: Vec<String>,
}

impl Whitelist {
    pub fn parse(spec: &str) -> Self {
        let mut whitelist = Self::default();

        for token in spec.split([',', ' ']) {
            if let Some(key) = token.strip_prefix('+') {
                if !key.is_empty() {
                    whitelist.required.push(key.to_string());
                }
            } else if !token.is_empty() {
                whitelist.optional.push(token.to_string());
            }
        }

        whitelist
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn optional(&self) -> &[String] {
        &self.optional
    }

    /// No keys at all, which callers treat as no whitelist
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty()
    }

    /// Required keys first, then optional keys, duplicates kept
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.required.iter().chain(self.optional.iter())
    }

    fn is_blank(value: &Value) -> bool {
        matches!(value, Value::String(s) if s.trim().is_empty())
    }

    /// Apply the whitelist to a record
    pub fn apply(&self, record: &Map<String, Value>) -> SanitisationResult {
        let mut errors = SanitiseErrors::default();

        for key in &self.required {
            match record.get(key) {
                None => errors.required.push(key.clone()),
                Some(value) if Self::is_blank(value) => errors.required.push(key.clone()),
                Some(_) => {}
            }
        }

        if !errors.is_empty() {
            return SanitisationResult {
                has_error: true,
                errors,
                sanitised: None,
            };
        }

        let sanitised = self
            .keys()
            .filter_map(|key| record.get(key).map(|value| (key.clone(), value.clone())))
            .collect();

        SanitisationResult {
            has_error: false,
            errors,
            sanitised: Some(sanitised),
        }
    }
}

/// Filter `record` down to the keys named in `whitelist`
///
/// Without a whitelist, or with one naming no keys, the record is returned
/// unchanged.
pub fn sanitise(record: &Map<String, Value>, whitelist: Option<&str>) -> SanitisationResult {
    match whitelist.map(Whitelist::parse) {
        Some(whitelist) if !whitelist.is_empty() => whitelist.apply(record),
        _ => SanitisationResult {
            has_error: false,
            errors: SanitiseErrors::default(),
            sanitised: Some(record.clone()),
        },
    }
}
