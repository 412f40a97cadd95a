//! Cache Module
//!
//! Result cache with a fixed TTL and write-age eviction over a pluggable
//! key-value backend.

mod backend;
mod clock;
mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use backend::{FileBackend, KeyValueStore, MemoryBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::ResultCache;

// == Public Constants ==
/// Lifetime of a cached result set in milliseconds (6 hours)
pub const CACHE_TTL_MS: i64 = 6 * 60 * 60 * 1000;

/// Maximum number of cached result sets kept at once
pub const MAX_CACHE_ENTRIES: usize = 50;
