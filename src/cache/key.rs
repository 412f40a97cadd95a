//! Cache Key Module
//!
//! Canonical, order-independent addressing of cached result sets.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::models::FilterSet;

/// Separates the resource-type partition from the filter signature.
/// Never produced by the URL-safe base64 alphabet.
const PARTITION_SEPARATOR: char = '.';

// == Cache Key ==
/// Key derived from a resource type and the populated fields of a filter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key. Empty filter values are omitted and the remaining
    /// fields are sorted by name, so insertion order never matters.
    pub fn new(filters: &FilterSet, resource_type: &str) -> Self {
        // A BTreeMap of &str serializes infallibly
        let signature = serde_json::to_string(&filters.populated()).unwrap_or_default();
        Self(format!(
            "{}{}{}",
            Self::partition(resource_type),
            PARTITION_SEPARATOR,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Encoded resource-type partition.
    pub fn partition(resource_type: &str) -> String {
        URL_SAFE_NO_PAD.encode(resource_type)
    }

    /// Returns true if a raw stored key belongs to the given resource type.
    pub fn in_partition(raw: &str, resource_type: &str) -> bool {
        raw.split_once(PARTITION_SEPARATOR)
            .is_some_and(|(partition, _)| partition == Self::partition(resource_type))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
