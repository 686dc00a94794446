//! In-memory implementation of Model for testing and development

use crate::core::{Conditions, Document, Model, Projection, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory document model
///
/// Keeps documents in insertion order behind an `RwLock`. Cloning shares the
/// underlying store. A minimal schema (defaults and required fields) can be
/// attached with the builder methods.
#[derive(Clone)]
pub struct InMemoryModel {
    id_key: String,
    defaults: Arc<Document>,
    required: Arc<Vec<String>>,
    docs: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryModel {
    /// Create an empty model keyed by `_id`
    pub fn new() -> Self {
        Self {
            id_key: "_id".to_string(),
            defaults: Arc::new(Document::new()),
            required: Arc::new(Vec::new()),
            docs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    /// Value stored when an inserted document lacks `field`
    pub fn with_default(mut self, field: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.defaults).insert(field.into(), value);
        self
    }

    /// Reject documents where `field` is missing or null
    pub fn with_required(mut self, field: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.required).push(field.into());
        self
    }

    /// Number of stored documents
    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Vec<Document>>> {
        self.docs.read().map_err(|_| StorageError::LockPoisoned("read"))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Vec<Document>>> {
        self.docs.write().map_err(|_| StorageError::LockPoisoned("write"))
    }

    fn check_required(&self, doc: &Document) -> StorageResult<()> {
        for field in self.required.iter() {
            if doc.get(field).is_none_or(Value::is_null) {
                return Err(StorageError::Validation {
                    field: field.clone(),
                    message: "is required".to_string(),
                });
            }
        }
        Ok(())
    }

    fn id_of(&self, doc: &Document) -> Option<String> {
        doc.get(&self.id_key).map(text_of)
    }

    fn project(&self, doc: &Document, projection: Option<&Projection>) -> Document {
        match projection {
            Some(projection) => projection.apply(doc, &self.id_key),
            None => doc.clone(),
        }
    }
}

impl Default for InMemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

/// String form used when comparing a field with a condition
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(doc: &Document, conditions: &Conditions) -> bool {
    conditions.iter().all(|(field, expected)| {
        doc.get(field)
            .is_some_and(|actual| text_of(actual) == text_of(expected))
    })
}

#[async_trait]
impl Model for InMemoryModel {
    fn id_key(&self) -> &str {
        &self.id_key
    }

    async fn find(
        &self,
        conditions: &Conditions,
        projection: Option<&Projection>,
    ) -> StorageResult<Vec<Document>> {
        let docs = self.read()?;

        Ok(docs
            .iter()
            .filter(|doc| matches(doc, conditions))
            .map(|doc| self.project(doc, projection))
            .collect())
    }

    async fn insert(&self, mut doc: Document) -> StorageResult<Document> {
        for (field, value) in self.defaults.iter() {
            doc.entry(field.clone()).or_insert_with(|| value.clone());
        }
        self.check_required(&doc)?;

        let id = match self.id_of(&doc) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert(self.id_key.clone(), Value::String(id.clone()));
                id
            }
        };

        let mut docs = self.write()?;
        if docs.iter().any(|d| self.id_of(d).as_deref() == Some(id.as_str())) {
            return Err(StorageError::Validation {
                field: self.id_key.clone(),
                message: format!("duplicate key '{id}'"),
            });
        }
        docs.push(doc.clone());

        Ok(doc)
    }

    async fn find_by_id(
        &self,
        id: &str,
        projection: Option<&Projection>,
    ) -> StorageResult<Option<Document>> {
        let docs = self.read()?;

        Ok(docs
            .iter()
            .find(|doc| self.id_of(doc).as_deref() == Some(id))
            .map(|doc| self.project(doc, projection)))
    }

    async fn save(&self, doc: Document) -> StorageResult<Document> {
        self.check_required(&doc)?;
        let id = self.id_of(&doc).ok_or_else(|| StorageError::Validation {
            field: self.id_key.clone(),
            message: "is required".to_string(),
        })?;

        let mut docs = self.write()?;
        match docs
            .iter()
            .position(|d| self.id_of(d).as_deref() == Some(id.as_str()))
        {
            Some(index) => docs[index] = doc.clone(),
            None => docs.push(doc.clone()),
        }

        Ok(doc)
    }

    async fn delete_one(&self, conditions: &Conditions) -> StorageResult<()> {
        let mut docs = self.write()?;

        if let Some(index) = docs.iter().position(|doc| matches(doc, conditions)) {
            docs.remove(index);
        }

        Ok(())
    }

    async fn delete_many(&self, conditions: &Conditions) -> StorageResult<()> {
        let mut docs = self.write()?;

        docs.retain(|doc| !matches(doc, conditions));

        Ok(())
    }
}
