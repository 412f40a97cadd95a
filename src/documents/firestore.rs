//! Firestore REST document store.
//!
//! Translates a [`Query`] into a `structuredQuery` for the `runQuery`
//! endpoint and decodes typed Firestore values into plain JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Constraint, DocumentStore, Query};
use crate::error::StoreError;
use crate::models::ResourceRecord;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for a Firestore database.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    /// Web API key, sent as the `key` query parameter
    pub api_key: Option<String>,
    /// Signed-in user's ID token, sent as a bearer token
    pub id_token: Option<String>,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            database: "(default)".to_string(),
            api_key: None,
            id_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents:runQuery",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

/// Document store backed by the Firestore REST API.
#[derive(Debug, Clone)]
pub struct FirestoreDocumentStore {
    client: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreDocumentStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn query(&self, query: &Query) -> Result<Vec<ResourceRecord>, StoreError> {
        let mut request = self
            .client
            .post(self.config.run_query_url())
            .json(&structured_query(query));

        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = &self.config.id_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(response_error(status, &body));
        }

        let records = parse_run_query(&body)?;
        debug!(
            collection = %query.collection,
            records = records.len(),
            "Firestore query complete"
        );
        Ok(records)
    }
}

// == Request Encoding ==
/// Builds the `runQuery` request body.
pub(crate) fn structured_query(query: &Query) -> Value {
    let mut filters: Vec<Value> = query
        .constraints
        .iter()
        .map(|constraint| match constraint {
            Constraint::Eq { field, value } => json!({
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": { "stringValue": value },
                }
            }),
        })
        .collect();

    let mut structured = Map::new();
    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": query.collection }]),
    );
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".to_string(), filters.remove(0));
        }
        _ => {
            structured.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }

    json!({ "structuredQuery": structured })
}

// == Response Decoding ==
/// Parses the streamed array returned by `runQuery`. Items without a
/// `document` (progress markers) are skipped.
pub(crate) fn parse_run_query(body: &str) -> Result<Vec<ResourceRecord>, StoreError> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| StoreError::Other(format!("malformed query response: {e}")))?;

    let mut records = Vec::new();
    for item in &items {
        if let Some(error) = item.get("error") {
            return Err(status_error(error, None));
        }
        let Some(document) = item.get("document") else {
            continue;
        };
        let id = document
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        let fields = document
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_default();
        records.push(ResourceRecord::new(id, fields));
    }
    Ok(records)
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Converts one typed Firestore value (`{"stringValue": "x"}`) to JSON.
pub(crate) fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => inner
            .as_str()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        // stringValue, booleanValue, doubleValue, timestampValue,
        // referenceValue, bytesValue, geoPointValue
        _ => inner.clone(),
    }
}

// == Error Mapping ==
fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() || e.is_connect() {
        StoreError::Transient(e.to_string())
    } else {
        StoreError::Other(e.to_string())
    }
}

/// Maps a failed HTTP response, preferring the Google status string.
pub(crate) fn response_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = parsed
        .get("error")
        .or_else(|| parsed.get(0).and_then(|item| item.get("error")));

    match error {
        Some(error) => status_error(error, Some(status)),
        None => by_http_status(status, format!("HTTP {status}: {body}")),
    }
}

fn status_error(error: &Value, http: Option<StatusCode>) -> StoreError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    match error.get("status").and_then(Value::as_str) {
        Some("PERMISSION_DENIED") => StoreError::PermissionDenied(message),
        Some("UNAUTHENTICATED") => StoreError::Unauthenticated(message),
        Some("NOT_FOUND") => StoreError::NotFound(message),
        Some("UNAVAILABLE" | "DEADLINE_EXCEEDED" | "RESOURCE_EXHAUSTED" | "ABORTED") => {
            StoreError::Transient(message)
        }
        _ => match http {
            Some(status) => by_http_status(status, message),
            None => StoreError::Other(message),
        },
    }
}

fn by_http_status(status: StatusCode, message: String) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthenticated(message),
        StatusCode::FORBIDDEN => StoreError::PermissionDenied(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => StoreError::Transient(message),
        _ => StoreError::Other(message),
    }
}
