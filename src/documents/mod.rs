//! Document Store Module
//!
//! The external document database consumed by the fetcher and the API.

mod firestore;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::ResourceRecord;

pub use firestore::{FirestoreConfig, FirestoreDocumentStore};
pub use memory::InMemoryDocumentStore;

/// Record field holding the resource type.
pub const RESOURCE_TYPE_FIELD: &str = "resource_type";

// == Query ==
/// A single equality constraint on a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Eq { field: String, value: String },
}

impl Constraint {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Constraint::Eq {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Equality-filtered, optionally limited read of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub constraints: Vec<Constraint>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            constraints: Vec::new(),
            limit: None,
        }
    }

    /// Adds `field == value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.push(Constraint::eq(field, value));
        self
    }

    /// Adds `field == value` only when a non-empty value is given.
    pub fn where_eq_opt(self, field: &str, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => self.where_eq(field, value),
            None => self,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// == Document Store ==
/// Asynchronous query capability of a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Runs the query and returns matching records tagged with their ids.
    async fn query(&self, query: &Query) -> Result<Vec<ResourceRecord>, StoreError>;
}
