//! Typed error handling for crudify
//!
//! # Error Categories
//!
//! - [`ConfigError`]: the generator was configured incorrectly. This is the
//!   only error returned to the caller of [`crudify`](crate::crudify).
//! - [`StorageError`]: a [`Model`](crate::core::Model) operation failed. It is
//!   written to the response body (or handed to after-hooks), never thrown.
//! - [`SanitiseErrors`]: the request body failed its whitelist. Also written
//!   to the response body.
//! - [`RequestError`]: the request could not be turned into a
//!   [`RequestContext`](crate::core::RequestContext).
//!
//! Response-level errors are serialised as data: the generated routes answer
//! `200 {"error": ...}` for storage and sanitisation failures.

use crate::core::sanitise::SanitiseErrors;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error body for storage and request failures
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while building a router
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No data model was supplied
    #[error("options.Model is required")]
    MissingModel,

    /// The identifying key cannot be used as a path parameter name
    #[error("invalid identifying key '{key}': must be non-empty without '/', '{{', '}}' or '*'")]
    InvalidIdentifyingKey { key: String },

    /// An action name did not match any of the six actions
    #[error("unknown action '{name}'")]
    UnknownAction { name: String },

    /// Failed to parse a settings document
    #[error("failed to parse config{}: {message}", file_suffix(.file))]
    Parse {
        file: Option<String>,
        message: String,
    },

    /// IO error while reading a settings file
    #[error("IO error: {message}")]
    Io { message: String },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" file '{f}'"))
        .unwrap_or_default()
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a data model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    /// No document matched the identifier
    #[error("document '{id}' not found")]
    NotFound { id: String },

    /// The document was rejected by the model's schema
    #[error("validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// A lock guarding the store was poisoned
    #[error("failed to acquire {0} lock")]
    LockPoisoned(&'static str),

    /// Any other backend failure
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl StorageError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "NOT_FOUND",
            StorageError::Validation { .. } => "VALIDATION_ERROR",
            StorageError::LockPoisoned(_) => "LOCK_POISONED",
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }

    /// Convert to an error body
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            StorageError::NotFound { id } => Some(serde_json::json!({ "id": id })),
            StorageError::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        }
    }
}

impl Serialize for StorageError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_response().serialize(serializer)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors raised while reading an incoming request
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body was not valid JSON
    #[error("invalid JSON body: {message}")]
    InvalidJson { message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::InvalidJson { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidJson { .. } => "INVALID_JSON",
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: None,
        };
        (self.status_code(), Json(serde_json::json!({ "error": body }))).into_response()
    }
}

// =============================================================================
// Action outcome errors
// =============================================================================

/// The error half of an action's outcome
///
/// Serialised untagged, so the body is either the storage error object or the
/// `{"required": [...], "invalid": [...]}` sanitisation object.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CrudError {
    Sanitise(SanitiseErrors),
    Storage(StorageError),
}

impl From<StorageError> for CrudError {
    fn from(err: StorageError) -> Self {
        CrudError::Storage(err)
    }
}

impl From<SanitiseErrors> for CrudError {
    fn from(err: SanitiseErrors) -> Self {
        CrudError::Sanitise(err)
    }
}

/// Result type for model operations
pub type StorageResult<T> = Result<T, StorageError>;
