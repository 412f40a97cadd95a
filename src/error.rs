//! Error types for the resource service
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error ==
/// Failures raised by a cache backend (key-value persistent store).
///
/// These never escape the result cache: reads degrade to a miss and writes
/// to a no-op.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing would exceed the backend's capacity ceiling
    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit} bytes")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Entry could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying file operation failed
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A previous holder of the backend lock panicked
    #[error("Storage lock poisoned")]
    Poisoned,
}

// == Store Error ==
/// Failures raised by a document store query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Caller lacks rights to read the collection
    #[error("permission-denied: {0}")]
    PermissionDenied(String),

    /// Caller is not signed in
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Target collection does not exist
    #[error("not-found: {0}")]
    NotFound(String),

    /// Backend reported a temporary condition
    #[error("unavailable: {0}")]
    Transient(String),

    /// Anything else; classified by message content
    #[error("{0}")]
    Other(String),
}

/// Message fragments that mark an otherwise unclassified failure as transient.
const TRANSIENT_SIGNALS: &[&str] = &[
    "network",
    "connection",
    "timeout",
    "fetch",
    "lost",
    "offline",
    "unavailable",
];

/// Failure categories used to decide whether a query is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    PermissionDenied,
    Unauthenticated,
    NotFound,
    Transient,
    Unknown,
}

impl ErrorClass {
    /// Permission, authentication and missing-collection failures are final.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Unknown)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::PermissionDenied => "permission_denied",
            ErrorClass::Unauthenticated => "unauthenticated",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Transient => "transient",
            ErrorClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl StoreError {
    /// Returns the retry category of this failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::PermissionDenied(_) => ErrorClass::PermissionDenied,
            StoreError::Unauthenticated(_) => ErrorClass::Unauthenticated,
            StoreError::NotFound(_) => ErrorClass::NotFound,
            StoreError::Transient(_) => ErrorClass::Transient,
            StoreError::Other(msg) => {
                let msg = msg.to_lowercase();
                if TRANSIENT_SIGNALS.iter().any(|signal| msg.contains(signal)) {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Unknown
                }
            }
        }
    }
}

// == App Error ==
/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Document store query failed; `context` is the message sent to the client
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Wraps a store failure with the client-facing message for the endpoint.
    pub fn upstream(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AppError::Upstream { context, source }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream { context, source } => {
                tracing::error!(class = %source.class(), "{}: {}", context, source);
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, AppError>;
