//! Resilient Fetch Module
//!
//! Cache-first, retrying lookup of resource records.

mod retry;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::ResultCache;
use crate::documents::{DocumentStore, Query, RESOURCE_TYPE_FIELD};
use crate::error::ErrorClass;
use crate::models::{FilterSet, ResourceRecord};

pub use retry::RetryPolicy;

/// Collection holding resource documents unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "resources";

// == Fetch Options ==
/// Per-call knobs for [`ResilientFetcher::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Total query attempts, including the first
    pub max_retries: u32,
    /// Consult and populate the result cache
    pub use_cache: bool,
    /// Upper bound on returned records
    pub max_results: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            use_cache: true,
            max_results: 50,
        }
    }
}

// == Resilient Fetcher ==
/// Fetches resource records under a filter set, masking every failure.
///
/// Callers always get a list. An empty list means either "no matches" or
/// "backend could not be reached"; the two are only distinguishable in the
/// logs.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    store: Arc<dyn DocumentStore>,
    cache: Arc<ResultCache>,
    collection: String,
    retry: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<ResultCache>) -> Self {
        Self {
            store,
            cache,
            collection: DEFAULT_COLLECTION.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    // == Query Building ==
    /// Builds the constrained query: resource type, year, degree,
    /// specialisation, then subject or (failing that) elective, then the
    /// result limit. Unset fields add no constraint.
    pub fn build_query(
        &self,
        filters: &FilterSet,
        resource_type: &str,
        max_results: usize,
    ) -> Query {
        let topic = match filters.get("subject") {
            Some(subject) => Some(("subject", subject)),
            None => filters.get("elective").map(|elective| ("elective", elective)),
        };

        let query = Query::new(self.collection.clone())
            .where_eq_opt(RESOURCE_TYPE_FIELD, Some(resource_type))
            .where_eq_opt("year", filters.get("year"))
            .where_eq_opt("degree", filters.get("degree"))
            .where_eq_opt("specialisation", filters.get("specialisation"));

        let query = match topic {
            Some((field, value)) => query.where_eq(field, value),
            None => query,
        };
        query.limit(max_results)
    }

    // == Fetch ==
    /// Returns records matching the filters. Never fails.
    pub async fn fetch(
        &self,
        filters: &FilterSet,
        resource_type: &str,
        options: FetchOptions,
    ) -> Vec<ResourceRecord> {
        if options.use_cache {
            if let Some(cached) = self.cache.get(filters, resource_type) {
                debug!(
                    resource_type,
                    records = cached.len(),
                    "Returning cached data"
                );
                return cached;
            }
        }

        let query = self.build_query(filters, resource_type, options.max_results);

        for attempt in 1..=options.max_retries {
            debug!(attempt, resource_type, "Fetch attempt");

            let err = match self.store.query(&query).await {
                Ok(data) => {
                    info!(
                        attempt,
                        resource_type,
                        records = data.len(),
                        "Fetch succeeded"
                    );
                    if options.use_cache && !data.is_empty() {
                        self.cache.set(filters, resource_type, &data);
                    }
                    return data;
                }
                Err(err) => err,
            };

            let class = err.class();
            if !class.is_retryable() {
                match class {
                    ErrorClass::PermissionDenied => {
                        error!(attempt, %class, resource_type, "Permission denied: {}", err)
                    }
                    ErrorClass::Unauthenticated => {
                        error!(attempt, %class, resource_type, "User not authenticated: {}", err)
                    }
                    _ => warn!(attempt, %class, resource_type, "Collection not found: {}", err),
                }
                return Vec::new();
            }

            if attempt == options.max_retries {
                error!(
                    attempt,
                    %class,
                    resource_type,
                    "Failed to fetch resources after {} attempts: {}",
                    attempt,
                    err
                );
                return Vec::new();
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                attempt,
                %class,
                resource_type,
                delay_ms = delay.as_millis() as u64,
                "Fetch attempt failed, retrying: {}",
                err
            );
            tokio::time::sleep(delay).await;
        }

        Vec::new()
    }
}
