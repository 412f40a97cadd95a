//! API Module
//!
//! HTTP handlers and routing for the resource service.
//!
//! # Endpoints
//! - `GET /resources` - Cached, retrying filtered lookup
//! - `GET /subjects` - Subjects and electives for a year and type
//! - `GET /search` - Resources matching a subject or elective
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache` - Clear the whole cache
//! - `DELETE /cache/:resource_type` - Clear one resource type
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
