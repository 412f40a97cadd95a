//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::documents::FirestoreConfig;
use crate::fetch::{FetchOptions, RetryPolicy, DEFAULT_COLLECTION};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Collection holding resource documents
    pub collection: String,
    /// Firestore project; the in-memory store is used when unset
    pub firestore_project_id: Option<String>,
    /// Firestore web API key
    pub firestore_api_key: Option<String>,
    /// ID token of the signed-in user, forwarded as a bearer token
    pub firestore_id_token: Option<String>,
    /// Firestore database name
    pub firestore_database: String,
    /// Firestore REST base URL (override for the emulator)
    pub firestore_base_url: Option<String>,
    /// File for the persistent cache backend; memory backend when unset
    pub cache_path: Option<PathBuf>,
    /// Capacity ceiling of the cache backend in bytes
    pub cache_quota_bytes: usize,
    /// Query attempts per fetch
    pub max_retries: u32,
    /// Backoff base delay in milliseconds
    pub base_delay_ms: u64,
    /// Default result limit per fetch
    pub max_results: usize,
    /// Document store request timeout in seconds
    pub request_timeout_secs: u64,
    /// JSON array of records to serve from the in-memory store
    pub seed_path: Option<PathBuf>,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RESOURCE_COLLECTION` - Document collection (default: resources)
    /// - `FIRESTORE_PROJECT_ID`, `FIRESTORE_API_KEY`, `FIRESTORE_ID_TOKEN`
    /// - `FIRESTORE_DATABASE` - Database name (default: (default))
    /// - `FIRESTORE_BASE_URL` - REST endpoint override
    /// - `CACHE_PATH` - Persistent cache file (default: in memory)
    /// - `CACHE_QUOTA_BYTES` - Cache capacity ceiling (default: 5 MiB)
    /// - `FETCH_MAX_RETRIES` - Attempts per fetch (default: 3)
    /// - `FETCH_BASE_DELAY_MS` - Backoff base delay (default: 1000)
    /// - `FETCH_MAX_RESULTS` - Result limit (default: 50)
    /// - `REQUEST_TIMEOUT_SECS` - Store request timeout (default: 10)
    /// - `SEED_PATH` - Records for the in-memory store
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SERVER_PORT", defaults.server_port),
            collection: optional("RESOURCE_COLLECTION").unwrap_or(defaults.collection),
            firestore_project_id: optional("FIRESTORE_PROJECT_ID"),
            firestore_api_key: optional("FIRESTORE_API_KEY"),
            firestore_id_token: optional("FIRESTORE_ID_TOKEN"),
            firestore_database: optional("FIRESTORE_DATABASE")
                .unwrap_or(defaults.firestore_database),
            firestore_base_url: optional("FIRESTORE_BASE_URL"),
            cache_path: optional("CACHE_PATH").map(PathBuf::from),
            cache_quota_bytes: parsed("CACHE_QUOTA_BYTES", defaults.cache_quota_bytes),
            max_retries: parsed("FETCH_MAX_RETRIES", defaults.max_retries),
            base_delay_ms: parsed("FETCH_BASE_DELAY_MS", defaults.base_delay_ms),
            max_results: parsed("FETCH_MAX_RESULTS", defaults.max_results),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            seed_path: optional("SEED_PATH").map(PathBuf::from),
        }
    }

    /// True when enough is set to reach Firestore (project and API key).
    pub fn firestore_configured(&self) -> bool {
        self.firestore_project_id.is_some() && self.firestore_api_key.is_some()
    }

    /// Firestore connection settings, if configured.
    pub fn firestore(&self) -> Option<FirestoreConfig> {
        if !self.firestore_configured() {
            return None;
        }
        let project_id = self.firestore_project_id.clone()?;
        let mut firestore = FirestoreConfig::new(project_id);
        firestore.database = self.firestore_database.clone();
        firestore.api_key = self.firestore_api_key.clone();
        firestore.id_token = self.firestore_id_token.clone();
        firestore.timeout = Duration::from_secs(self.request_timeout_secs);
        if let Some(base_url) = &self.firestore_base_url {
            firestore.base_url = base_url.clone();
        }
        Some(firestore)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_retries: self.max_retries,
            use_cache: true,
            max_results: self.max_results,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.base_delay_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            collection: DEFAULT_COLLECTION.to_string(),
            firestore_project_id: None,
            firestore_api_key: None,
            firestore_id_token: None,
            firestore_database: "(default)".to_string(),
            firestore_base_url: None,
            cache_path: None,
            cache_quota_bytes: 5 * 1024 * 1024,
            max_retries: 3,
            base_delay_ms: 1000,
            max_results: 50,
            request_timeout_secs: 10,
            seed_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.collection, "resources");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_results, 50);
        assert_eq!(config.fetch_options(), FetchOptions::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(!config.firestore_configured());
        assert!(config.firestore().is_none());
    }

    #[test]
    fn test_firestore_requires_project_and_key() {
        let mut config = Config {
            firestore_project_id: Some("demo".to_string()),
            ..Config::default()
        };
        assert!(!config.firestore_configured());

        config.firestore_api_key = Some("key".to_string());
        config.firestore_base_url = Some("http://localhost:8080/v1".to_string());
        config.request_timeout_secs = 3;

        let firestore = config.firestore().unwrap();
        assert_eq!(firestore.project_id, "demo");
        assert_eq!(firestore.api_key.as_deref(), Some("key"));
        assert_eq!(firestore.base_url, "http://localhost:8080/v1");
        assert_eq!(firestore.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_parsed_falls_back_on_garbage() {
        env::set_var("RESOURCE_CACHE_TEST_PORT", "not-a-port");
        assert_eq!(parsed("RESOURCE_CACHE_TEST_PORT", 8080u16), 8080);
        env::remove_var("RESOURCE_CACHE_TEST_PORT");
    }
}
