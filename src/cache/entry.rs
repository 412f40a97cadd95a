//! Cache Entry Module
//!
//! Defines the stored form of a cached result set with its TTL window.

use serde::{Deserialize, Serialize};

use crate::models::ResourceRecord;

// == Cache Entry ==
/// A cached result set plus its creation and expiry timestamps.
///
/// Entries are immutable once written; a later `set` for the same key
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The cached records
    pub data: Vec<ResourceRecord>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry written at `now_ms` that lives for `ttl_ms`.
    pub fn new(data: Vec<ResourceRecord>, now_ms: i64, ttl_ms: i64) -> Self {
        Self {
            data,
            created_at: now_ms,
            expires_at: now_ms + ttl_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is still live at exactly `expires_at`; it expires once the
    /// current time is strictly past it.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}
