//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, clear_resource_type_handler, health_handler, resources_handler,
    search_handler, stats_handler, subjects_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /resources` - Filtered resource lookup through the cache
/// - `GET /subjects` - Distinct subjects for a year and type
/// - `GET /search` - Subject or elective search
/// - `GET /cache/stats` - Cache statistics
/// - `DELETE /cache` - Clear every cache entry
/// - `DELETE /cache/:resource_type` - Clear one resource type
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/resources", get(resources_handler))
        .route("/subjects", get(subjects_handler))
        .route("/search", get(search_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/:resource_type", delete(clear_resource_type_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::documents::InMemoryDocumentStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = AppState::with_store(store, Arc::new(ResultCache::in_memory()));
        create_router(state)
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("GET", "/cache/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resources_endpoint() {
        assert_eq!(
            status_of("GET", "/resources?resourceType=CT%20Paper").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_subjects_missing_params() {
        assert_eq!(status_of("GET", "/subjects").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_resource_type_endpoint() {
        assert_eq!(
            status_of("DELETE", "/cache/Sem%20Paper").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        assert_eq!(status_of("GET", "/get/key").await, StatusCode::NOT_FOUND);
    }
}
