//! Response DTOs for the resource API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::ResourceRecord;

/// Response body for `GET /resources` and `GET /search`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesResponse {
    /// Resource type the records were filtered on
    pub resource_type: String,
    /// Number of records returned
    pub count: usize,
    /// The matching records
    pub resources: Vec<ResourceRecord>,
}

impl ResourcesResponse {
    pub fn new(resource_type: impl Into<String>, resources: Vec<ResourceRecord>) -> Self {
        Self {
            resource_type: resource_type.into(),
            count: resources.len(),
            resources,
        }
    }
}

/// Response body for `GET /subjects`
#[derive(Debug, Clone, Serialize)]
pub struct SubjectsResponse {
    /// Distinct subject and elective names, sorted
    pub subjects: Vec<String>,
}

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the cache clearing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn all(removed: usize) -> Self {
        Self {
            message: "Cleared all cache entries".to_string(),
            removed,
        }
    }

    pub fn resource_type(resource_type: &str, removed: usize) -> Self {
        Self {
            message: format!("Cleared cache for resource type: {}", resource_type),
            removed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_resources_response_counts() {
        let resp = ResourcesResponse::new(
            "CT Paper",
            vec![ResourceRecord::new("a", Map::new())],
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["resourceType"], "CT Paper");
        assert_eq!(json["count"], 1);
        assert_eq!(json["resources"][0]["id"], "a");
    }

    #[test]
    fn test_stats_response_flattens() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.total_entries = 3;

        let json = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["totalEntries"], 3);
        assert_eq!(json["hitRate"], 0.5);
    }

    #[test]
    fn test_clear_response_message() {
        let resp = ClearResponse::resource_type("Sem Paper", 4);
        assert!(resp.message.contains("Sem Paper"));
        assert_eq!(resp.removed, 4);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
