//! Request and Response models
//!
//! Filter and record types shared by the cache and fetcher, plus the DTOs
//! used for HTTP query strings and response bodies.

pub mod filters;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use filters::{FilterSet, ResourceRecord};
pub use requests::{CatalogQuery, ResourcesQuery, KNOWN_RESOURCE_TYPES, KNOWN_YEARS};
pub use responses::{
    ClearResponse, ErrorResponse, HealthResponse, ResourcesResponse, StatsResponse,
    SubjectsResponse,
};
