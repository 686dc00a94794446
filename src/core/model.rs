//! The data-access collaborator behind the generated routes

use crate::core::error::StorageResult;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored record
pub type Document = Map<String, Value>;

/// Field/value pairs a document must match
pub type Conditions = Map<String, Value>;

/// Field selection applied to query results
///
/// Parsed from a space- or comma-separated list. Plain names select fields,
/// names prefixed with `-` drop them. A projection is either inclusive or
/// exclusive; mixing the two keeps only the inclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse a selection string, `None` if it names no fields
    pub fn parse(spec: &str) -> Option<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for token in spec.split([',', ' ']).filter(|t| !t.is_empty()) {
            match token.strip_prefix('-') {
                Some(field) if !field.is_empty() => exclude.push(field.to_string()),
                Some(_) => {}
                None => include.push(token.to_string()),
            }
        }

        if !include.is_empty() {
            Some(Projection::Include(include))
        } else if !exclude.is_empty() {
            Some(Projection::Exclude(exclude))
        } else {
            None
        }
    }

    /// Apply to a document
    ///
    /// `id_key` survives an inclusive projection unless it is excluded.
    pub fn apply(&self, doc: &Document, id_key: &str) -> Document {
        match self {
            Projection::Include(fields) => doc
                .iter()
                .filter(|(k, _)| k.as_str() == id_key || fields.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Projection::Exclude(fields) => doc
                .iter()
                .filter(|(k, _)| !fields.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Data model used by the generated handlers
///
/// Implementations own querying and persistence. The generator never retries
/// a failed call and never inspects the error beyond serialising it.
#[async_trait]
pub trait Model: Send + Sync {
    /// Name of the field holding a document's identifier
    fn id_key(&self) -> &str {
        "_id"
    }

    /// Documents matching every condition
    async fn find(
        &self,
        conditions: &Conditions,
        projection: Option<&Projection>,
    ) -> StorageResult<Vec<Document>>;

    /// Create a new document from `doc`
    async fn insert(&self, doc: Document) -> StorageResult<Document>;

    /// Document with the given identifier, if any
    async fn find_by_id(
        &self,
        id: &str,
        projection: Option<&Projection>,
    ) -> StorageResult<Option<Document>>;

    /// Persist an existing (possibly modified) document
    async fn save(&self, doc: Document) -> StorageResult<Document>;

    /// Remove the first document matching the conditions
    async fn delete_one(&self, conditions: &Conditions) -> StorageResult<()>;

    /// Remove every document matching the conditions
    async fn delete_many(&self, conditions: &Conditions) -> StorageResult<()>;
}
