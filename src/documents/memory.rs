//! In-process document store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{Constraint, DocumentStore, Query};
use crate::error::StoreError;
use crate::models::ResourceRecord;

/// Collections of records held in memory, queried by string equality.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<ResourceRecord>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one collection populated.
    pub fn with_records(collection: impl Into<String>, records: Vec<ResourceRecord>) -> Self {
        let store = Self::new();
        store.insert_all(collection, records);
        store
    }

    /// Loads a collection from a JSON array of `{"id": ..., ...}` objects.
    pub fn from_json_file(
        collection: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<ResourceRecord> = serde_json::from_str(&raw)?;
        Ok(Self::with_records(collection, records))
    }

    pub fn insert_all(&self, collection: impl Into<String>, records: Vec<ResourceRecord>) {
        if let Ok(mut collections) = self.collections.write() {
            collections
                .entry(collection.into())
                .or_default()
                .extend(records);
        }
    }

    fn matches(record: &ResourceRecord, constraints: &[Constraint]) -> bool {
        constraints.iter().all(|constraint| match constraint {
            Constraint::Eq { field, value } => {
                record.fields.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<ResourceRecord>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Other("document store lock poisoned".to_string()))?;

        let Some(records) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        Ok(records
            .iter()
            .filter(|record| Self::matches(record, &query.constraints))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
