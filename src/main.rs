//! Resource Cache - cached, retrying lookup of study resources
//!
//! HTTP front end over the result cache and resilient fetcher.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_cache::{
    api::create_router,
    cache::{FileBackend, KeyValueStore, MemoryBackend, SystemClock},
    documents::{DocumentStore, FirestoreDocumentStore, InMemoryDocumentStore},
    AppState, Config, ResilientFetcher, ResultCache,
};

/// Main entry point for the resource server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache backend and document store
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resource_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resource server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: collection={}, port={}, max_retries={}, max_results={}",
        config.collection, config.server_port, config.max_retries, config.max_results
    );

    let backend = open_cache_backend(&config)?;
    let cache = Arc::new(ResultCache::new(backend, Arc::new(SystemClock)));
    let store = open_document_store(&config)?;

    let fetcher = ResilientFetcher::new(store.clone(), cache)
        .with_collection(config.collection.clone())
        .with_retry_policy(config.retry_policy());
    let state = AppState::new(
        store,
        fetcher,
        config.collection.clone(),
        config.fetch_options(),
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Persistent file backend when `CACHE_PATH` is set, memory otherwise.
fn open_cache_backend(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match &config.cache_path {
        Some(path) => {
            let backend = FileBackend::open(path, Some(config.cache_quota_bytes))
                .with_context(|| format!("failed to open cache at {}", path.display()))?;
            info!("Cache backend: file {}", path.display());
            Ok(Arc::new(backend))
        }
        None => {
            info!("Cache backend: memory");
            Ok(Arc::new(MemoryBackend::with_quota(config.cache_quota_bytes)))
        }
    }
}

/// Firestore when configured, otherwise the in-memory store (optionally seeded).
fn open_document_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if let Some(firestore) = config.firestore() {
        info!(
            "Document store: Firestore project {} database {}",
            firestore.project_id, firestore.database
        );
        let store = FirestoreDocumentStore::new(firestore).context("failed to build HTTP client")?;
        return Ok(Arc::new(store));
    }

    error!("Firestore configuration is incomplete - check FIRESTORE_PROJECT_ID and FIRESTORE_API_KEY");
    match &config.seed_path {
        Some(path) => {
            let store = InMemoryDocumentStore::from_json_file(config.collection.clone(), path)
                .with_context(|| format!("failed to load seed data from {}", path.display()))?;
            info!("Document store: in-memory, seeded from {}", path.display());
            Ok(Arc::new(store))
        }
        None => {
            warn!("Document store: in-memory and empty; every query returns no results");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
