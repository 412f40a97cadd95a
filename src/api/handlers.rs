//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    Json,
};
use tracing::info;

use crate::cache::ResultCache;
use crate::documents::{DocumentStore, Query, RESOURCE_TYPE_FIELD};
use crate::error::{AppError, Result};
use crate::fetch::{FetchOptions, ResilientFetcher};
use crate::models::{
    CatalogQuery, ClearResponse, HealthResponse, ResourceRecord, ResourcesQuery,
    ResourcesResponse, StatsResponse, SubjectsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared result cache
    pub cache: Arc<ResultCache>,
    /// Cache-first retrying fetcher
    pub fetcher: Arc<ResilientFetcher>,
    /// Document store for catalogue queries
    pub store: Arc<dyn DocumentStore>,
    /// Collection holding resource documents
    pub collection: String,
    /// Server-wide fetch defaults
    pub defaults: FetchOptions,
}

impl AppState {
    /// Creates state around a fetcher, sharing its cache and store.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        fetcher: ResilientFetcher,
        collection: impl Into<String>,
        defaults: FetchOptions,
    ) -> Self {
        Self {
            cache: fetcher.cache().clone(),
            fetcher: Arc::new(fetcher),
            store,
            collection: collection.into(),
            defaults,
        }
    }

    /// Creates state with default options over the given store and cache.
    pub fn with_store(store: Arc<dyn DocumentStore>, cache: Arc<ResultCache>) -> Self {
        let fetcher = ResilientFetcher::new(store.clone(), cache);
        Self::new(
            store,
            fetcher,
            crate::fetch::DEFAULT_COLLECTION,
            FetchOptions::default(),
        )
    }
}

/// Handler for GET /resources
///
/// Returns resources matching the filters. Always succeeds; an unreachable
/// backend shows up as an empty list.
pub async fn resources_handler(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ResourcesQuery>,
) -> Json<ResourcesResponse> {
    let filters = params.filters();
    let options = params.options(state.defaults);
    let resources = state
        .fetcher
        .fetch(&filters, params.resource_type(), options)
        .await;

    Json(ResourcesResponse::new(params.resource_type(), resources))
}

/// Handler for GET /subjects
///
/// Lists distinct subject and elective names for a year and resource type.
pub async fn subjects_handler(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CatalogQuery>,
) -> Result<Json<SubjectsResponse>> {
    let (year, resource_type) = params.year_and_type().map_err(AppError::InvalidRequest)?;

    let query = Query::new(state.collection.clone())
        .where_eq("year", year)
        .where_eq(RESOURCE_TYPE_FIELD, resource_type);
    let records = state
        .store
        .query(&query)
        .await
        .map_err(AppError::upstream("Failed to fetch subjects"))?;

    let subjects: BTreeSet<String> = records
        .iter()
        .flat_map(|record| [record.str_field("subject"), record.str_field("elective")])
        .flatten()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Json(SubjectsResponse {
        subjects: subjects.into_iter().collect(),
    }))
}

/// Handler for GET /search
///
/// Finds resources whose subject or elective matches, de-duplicated by id
/// and sorted by title.
pub async fn search_handler(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CatalogQuery>,
) -> Result<Json<ResourcesResponse>> {
    let (year, resource_type, subject) =
        params.search_terms().map_err(AppError::InvalidRequest)?;

    let base = Query::new(state.collection.clone())
        .where_eq("year", year)
        .where_eq(RESOURCE_TYPE_FIELD, resource_type);
    let by_subject = base.clone().where_eq("subject", subject);
    let by_elective = base.where_eq("elective", subject);

    let (subject_hits, elective_hits) = tokio::try_join!(
        state.store.query(&by_subject),
        state.store.query(&by_elective)
    )
    .map_err(AppError::upstream("Failed to search resources"))?;

    let resources = merge_by_title(subject_hits, elective_hits);
    info!(
        year,
        resource_type,
        subject,
        results = resources.len(),
        "Search complete"
    );

    Ok(Json(ResourcesResponse::new(resource_type, resources)))
}

/// Concatenates both lists keeping the first record per id, sorted by title.
fn merge_by_title(first: Vec<ResourceRecord>, second: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<ResourceRecord> = first
        .into_iter()
        .chain(second)
        .filter(|record| seen.insert(record.id.clone()))
        .collect();
    merged.sort_by(|a, b| {
        compare_titles(
            a.str_field("title").unwrap_or_default(),
            b.str_field("title").unwrap_or_default(),
        )
    });
    merged
}

/// Dictionary order: case-insensitive first, then lowercase before uppercase.
fn compare_titles(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<String>();
    folded(a).cmp(&folded(b)).then_with(|| b.cmp(a))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::all(state.cache.clear_all()))
}

/// Handler for DELETE /cache/:resource_type
///
/// Drops cached results for one resource type so a context switch never
/// serves the old type's data.
pub async fn clear_resource_type_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> Json<ClearResponse> {
    let removed = state.cache.clear_for_resource_type(&resource_type);
    Json(ClearResponse::resource_type(&resource_type, removed))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::InMemoryDocumentStore;
    use crate::models::FilterSet;
    use serde_json::json;

    fn record(id: &str, title: &str, subject: Option<&str>, elective: Option<&str>) -> ResourceRecord {
        let mut value = json!({
            "id": id,
            "title": title,
            "year": "1st Year",
            "resource_type": "CT Paper",
        });
        if let Some(subject) = subject {
            value["subject"] = json!(subject);
        }
        if let Some(elective) = elective {
            value["elective"] = json!(elective);
        }
        serde_json::from_value(value).unwrap()
    }

    fn state() -> AppState {
        let store = Arc::new(InMemoryDocumentStore::with_records(
            "resources",
            vec![
                record("1", "Maths CT 2", Some("Maths"), None),
                record("2", "Maths CT 1", Some("Maths"), None),
                record("3", "AI Elective", None, Some("Maths")),
                record("4", "Physics CT", Some("Physics"), None),
                record("5", "Chem CT", Some("Chemistry"), Some("Chemistry")),
            ],
        ));
        AppState::with_store(store, Arc::new(ResultCache::in_memory()))
    }

    fn catalog(year: &str, ty: &str, subject: Option<&str>) -> QueryParams<CatalogQuery> {
        QueryParams(CatalogQuery {
            year: Some(year.to_string()),
            resource_type: Some(ty.to_string()),
            subject: subject.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_resources_handler_filters() {
        let params = ResourcesQuery {
            resource_type: Some("CT Paper".to_string()),
            subject: Some("Physics".to_string()),
            ..ResourcesQuery::default()
        };

        let response = resources_handler(State(state()), QueryParams(params)).await;
        assert_eq!(response.count, 1);
        assert_eq!(response.resources[0].id, "4");
    }

    #[tokio::test]
    async fn test_resources_handler_caches() {
        let state = state();
        let params = ResourcesQuery {
            resource_type: Some("CT Paper".to_string()),
            year: Some("1st Year".to_string()),
            ..ResourcesQuery::default()
        };

        resources_handler(State(state.clone()), QueryParams(params)).await;

        let filters = FilterSet::new().with_year("1st Year");
        assert!(state.cache.get(&filters, "CT Paper").is_some());
    }

    #[tokio::test]
    async fn test_subjects_handler() {
        let response = subjects_handler(State(state()), catalog("1st Year", "CT Paper", None))
            .await
            .unwrap();
        assert_eq!(response.subjects, vec!["Chemistry", "Maths", "Physics"]);
    }

    #[tokio::test]
    async fn test_subjects_handler_invalid() {
        let result = subjects_handler(State(state()), catalog("1st Year", "Quiz", None)).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_search_handler_merges_and_sorts() {
        let response = search_handler(
            State(state()),
            catalog("1st Year", "CT Paper", Some("Maths")),
        )
        .await
        .unwrap();

        let ids: Vec<_> = response.resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_merge_by_title_ignores_case() {
        let merged = merge_by_title(
            vec![
                record("1", "physics notes", None, None),
                record("2", "Maths", None, None),
            ],
            vec![
                record("3", "Algebra", None, None),
                record("4", "maths", None, None),
            ],
        );

        let titles: Vec<_> = merged.iter().filter_map(|r| r.str_field("title")).collect();
        assert_eq!(titles, vec!["Algebra", "maths", "Maths", "physics notes"]);
    }

    #[tokio::test]
    async fn test_search_handler_deduplicates() {
        let response = search_handler(
            State(state()),
            catalog("1st Year", "CT Paper", Some("Chemistry")),
        )
        .await
        .unwrap();

        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn test_search_handler_requires_subject() {
        let result = search_handler(State(state()), catalog("1st Year", "CT Paper", None)).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_handlers() {
        let state = state();
        let filters = FilterSet::new().with_year("1st Year");
        state.cache.set(&filters, "CT Paper", &[record("1", "x", None, None)]);
        state.cache.set(&filters, "Sem Paper", &[record("2", "y", None, None)]);

        let response =
            clear_resource_type_handler(State(state.clone()), Path("CT Paper".to_string())).await;
        assert_eq!(response.removed, 1);

        let response = clear_cache_handler(State(state.clone())).await;
        assert_eq!(response.removed, 1);
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(state())).await;
        assert_eq!(response.stats.hits, 0);
        assert_eq!(response.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
