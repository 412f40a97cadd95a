//! Resource Cache - cached, retrying lookup of study resources
//!
//! Serves filtered resource lists from a document database through a
//! bounded TTL result cache, retrying transient backend failures.

pub mod api;
pub mod cache;
pub mod config;
pub mod documents;
pub mod error;
pub mod fetch;
pub mod models;

pub use api::AppState;
pub use cache::ResultCache;
pub use config::Config;
pub use fetch::{FetchOptions, ResilientFetcher};
