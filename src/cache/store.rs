//! Result Cache Module
//!
//! Bounded, TTL-expiring cache of document query results, addressed by a
//! canonical filter signature.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheKey, CacheStats, Clock, KeyValueStore, MemoryBackend, SystemClock,
    CACHE_TTL_MS, MAX_CACHE_ENTRIES,
};
use crate::error::StorageError;
use crate::models::{FilterSet, ResourceRecord};

// == Result Cache ==
/// Best-effort result cache over a dedicated key-value backend.
///
/// No operation reports failure to the caller: backend errors are logged and
/// degrade to a miss (reads) or a no-op (writes).
#[derive(Debug)]
pub struct ResultCache {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    stats: Mutex<CacheStats>,
}

impl ResultCache {
    // == Constructor ==
    /// Creates a cache over the given backend and time source.
    pub fn new(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Creates a cache over a fresh in-memory backend using wall-clock time.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(SystemClock))
    }

    // == Get ==
    /// Returns the cached records for these filters, if a live entry exists.
    ///
    /// An expired entry is removed as a side effect. The returned records are
    /// a snapshot; changing them does not affect the stored entry.
    pub fn get(&self, filters: &FilterSet, resource_type: &str) -> Option<Vec<ResourceRecord>> {
        let key = CacheKey::new(filters, resource_type);
        match self.read_live(&key) {
            Ok(Some(data)) => {
                debug!(key = %key, records = data.len(), "Cache hit");
                self.with_stats(CacheStats::record_hit);
                Some(data)
            }
            Ok(None) => {
                self.with_stats(CacheStats::record_miss);
                None
            }
            Err(e) => {
                warn!(key = %key, "Error reading from cache: {}", e);
                self.with_stats(CacheStats::record_miss);
                None
            }
        }
    }

    fn read_live(&self, key: &CacheKey) -> Result<Option<Vec<ResourceRecord>>, StorageError> {
        let Some(raw) = self.backend.get(key.as_str())? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_str(&raw)?;
        if entry.is_expired(self.clock.now_ms()) {
            debug!(key = %key, "Cache entry expired");
            self.backend.remove(key.as_str())?;
            return Ok(None);
        }
        Ok(Some(entry.data))
    }

    // == Set ==
    /// Stores records for these filters with the fixed TTL, then enforces the
    /// size limit.
    pub fn set(&self, filters: &FilterSet, resource_type: &str, data: &[ResourceRecord]) {
        let key = CacheKey::new(filters, resource_type);
        let entry = CacheEntry::new(data.to_vec(), self.clock.now_ms(), CACHE_TTL_MS);

        let written = serde_json::to_string(&entry)
            .map_err(StorageError::from)
            .and_then(|raw| self.backend.set(key.as_str(), raw));

        match written {
            Ok(()) => {
                debug!(key = %key, records = data.len(), "Cached data");
                self.enforce_capacity();
            }
            Err(e) => warn!(key = %key, "Error writing to cache: {}", e),
        }
    }

    // == Capacity Enforcement ==
    /// Evicts the oldest-written entries while more than the limit are stored.
    /// Unreadable entries met during the scan are deleted outright.
    fn enforce_capacity(&self) {
        let keys = match self.backend.list_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Error cleaning up cache: {}", e);
                return;
            }
        };
        if keys.len() <= MAX_CACHE_ENTRIES {
            return;
        }

        let mut entries: Vec<(String, i64)> = Vec::with_capacity(keys.len());
        for key in keys {
            let raw = match self.backend.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, "Error reading cache entry during cleanup: {}", e);
                    continue;
                }
            };

            match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => entries.push((key, entry.created_at)),
                Err(e) => {
                    warn!(key = %key, "Removing unreadable cache entry: {}", e);
                    if let Err(e) = self.backend.remove(&key) {
                        warn!(key = %key, "Error removing unreadable cache entry: {}", e);
                    }
                }
            }
        }

        if entries.len() <= MAX_CACHE_ENTRIES {
            return;
        }

        entries.sort_by_key(|(_, created_at)| *created_at);
        let excess = entries.len() - MAX_CACHE_ENTRIES;
        let mut evicted = 0;
        for (key, _) in entries.into_iter().take(excess) {
            match self.backend.remove(&key) {
                Ok(()) => {
                    debug!(key = %key, "Removed old cache entry");
                    evicted += 1;
                }
                Err(e) => warn!(key = %key, "Error evicting cache entry: {}", e),
            }
        }
        self.with_stats(|stats| stats.record_evictions(evicted));
    }

    // == Clear ==
    /// Removes every entry. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let removed = self.remove_where(|_| true);
        info!(removed, "Cleared all cache entries");
        removed
    }

    /// Removes only entries cached under `resource_type`. Returns how many
    /// were removed.
    pub fn clear_for_resource_type(&self, resource_type: &str) -> usize {
        let removed = self.remove_where(|key| CacheKey::in_partition(key, resource_type));
        info!(removed, resource_type, "Cleared cache for resource type");
        removed
    }

    fn remove_where(&self, predicate: impl Fn(&str) -> bool) -> usize {
        let keys = match self.backend.list_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Error clearing cache: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| predicate(key)) {
            match self.backend.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(key = %key, "Error clearing cache: {}", e);
                    break;
                }
            }
        }
        removed
    }

    // == Stats ==
    /// Returns counters plus current entry count and stored size.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        match self.occupancy() {
            Ok((entries, size)) => {
                stats.total_entries = entries;
                stats.total_size = size;
            }
            Err(e) => warn!("Error getting cache stats: {}", e),
        }
        stats
    }

    fn occupancy(&self) -> Result<(usize, usize), StorageError> {
        let keys = self.backend.list_keys()?;
        let mut size = 0;
        for key in &keys {
            if let Some(raw) = self.backend.get(key)? {
                size += raw.len();
            }
        }
        Ok((keys.len(), size))
    }

    // == Length ==
    /// Returns the number of stored entries, 0 if the backend is unreadable.
    pub fn len(&self) -> usize {
        self.backend.list_keys().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_stats(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::{json, Map};
    use std::time::Duration;

    const START_MS: i64 = 1_700_000_000_000;

    fn record(id: &str, title: &str) -> ResourceRecord {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(title));
        ResourceRecord::new(id, fields)
    }

    fn manual_cache() -> (ResultCache, Arc<MemoryBackend>, Arc<ManualClock>) {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = ResultCache::new(backend.clone(), clock.clone());
        (cache, backend, clock)
    }

    #[test]
    fn test_set_then_get_returns_data() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year").with_subject("Maths");
        let data = vec![record("a", "Maths CT 1"), record("b", "Maths CT 2")];

        cache.set(&filters, "CT Paper", &data);

        assert_eq!(cache.get(&filters, "CT Paper"), Some(data));
    }

    #[test]
    fn test_set_then_get_record_with_own_id_field() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        let fields = json!({"id": "legacy-7", "title": "Notes"});
        let data = vec![ResourceRecord::new(
            "doc-abc",
            fields.as_object().unwrap().clone(),
        )];

        cache.set(&filters, "CT Paper", &data);

        assert_eq!(cache.get(&filters, "CT Paper"), Some(data));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_get_missing() {
        let (cache, _, _) = manual_cache();
        assert!(cache.get(&FilterSet::new(), "CT Paper").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_get_other_resource_type_misses() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        cache.set(&filters, "CT Paper", &[record("a", "x")]);

        assert!(cache.get(&filters, "Sem Paper").is_none());
    }

    #[test]
    fn test_entry_live_until_ttl_elapses() {
        let (cache, _, clock) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        cache.set(&filters, "CT Paper", &[record("a", "x")]);

        clock.advance(Duration::from_millis(CACHE_TTL_MS as u64));
        assert!(cache.get(&filters, "CT Paper").is_some());
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let (cache, backend, clock) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        cache.set(&filters, "CT Paper", &[record("a", "x")]);

        clock.advance(Duration::from_secs(6 * 60 * 60) + Duration::from_millis(1));

        assert!(cache.get(&filters, "CT Paper").is_none());
        assert!(backend.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_subject("Physics");
        cache.set(&filters, "Sem Paper", &[record("a", "old")]);
        cache.set(&filters, "Sem Paper", &[record("b", "new")]);

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&filters, "Sem Paper"),
            Some(vec![record("b", "new")])
        );
    }

    #[test]
    fn test_capacity_evicts_oldest_written() {
        let (cache, _, clock) = manual_cache();

        for i in 0..=MAX_CACHE_ENTRIES {
            let filters = FilterSet::new().with_subject(format!("subject-{i}"));
            cache.set(&filters, "CT Paper", &[record(&i.to_string(), "x")]);
            clock.advance(Duration::from_millis(1));
        }

        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);
        assert!(cache
            .get(&FilterSet::new().with_subject("subject-0"), "CT Paper")
            .is_none());
        for i in 1..=MAX_CACHE_ENTRIES {
            let filters = FilterSet::new().with_subject(format!("subject-{i}"));
            assert!(cache.get(&filters, "CT Paper").is_some(), "subject-{i} evicted");
        }
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_scan_deletes_corrupt_entries() {
        let (cache, backend, clock) = manual_cache();
        backend.set("garbage", "{not json".to_string()).unwrap();

        for i in 0..MAX_CACHE_ENTRIES {
            let filters = FilterSet::new().with_subject(format!("subject-{i}"));
            cache.set(&filters, "CT Paper", &[record("a", "x")]);
            clock.advance(Duration::from_millis(1));
        }

        // The corrupt entry pushed the count over the limit and was dropped
        // instead of a valid one.
        assert!(backend.get("garbage").unwrap().is_none());
        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);
        assert_eq!(cache.stats().evictions, 0);
    }

    /// Memory backend whose reads fail for chosen keys.
    #[derive(Debug, Default)]
    struct FailingReads {
        inner: MemoryBackend,
        failing: Mutex<Vec<String>>,
    }

    impl KeyValueStore for FailingReads {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.failing.lock().unwrap().iter().any(|k| k == key) {
                return Err(StorageError::Poisoned);
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn list_keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.list_keys()
        }
    }

    #[test]
    fn test_capacity_scan_keeps_entries_it_cannot_read() {
        let backend = Arc::new(FailingReads::default());
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = ResultCache::new(backend.clone(), clock.clone());

        let unreadable = FilterSet::new().with_subject("unreadable");
        cache.set(&unreadable, "CT Paper", &[record("a", "x")]);
        let key = CacheKey::new(&unreadable, "CT Paper");
        backend.failing.lock().unwrap().push(key.as_str().to_string());
        clock.advance(Duration::from_millis(1));

        for i in 0..MAX_CACHE_ENTRIES {
            let filters = FilterSet::new().with_subject(format!("subject-{i}"));
            cache.set(&filters, "CT Paper", &[record("a", "x")]);
            clock.advance(Duration::from_millis(1));
        }

        // A failed read is not corruption; the entry survives the scan
        assert!(backend.inner.get(key.as_str()).unwrap().is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let (cache, backend, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        let key = CacheKey::new(&filters, "CT Paper");
        backend.set(key.as_str(), "oops".to_string()).unwrap();

        assert!(cache.get(&filters, "CT Paper").is_none());
    }

    #[test]
    fn test_clear_all() {
        let (cache, _, _) = manual_cache();
        cache.set(&FilterSet::new().with_year("1st Year"), "CT Paper", &[record("a", "x")]);
        cache.set(&FilterSet::new().with_year("2nd Year"), "Sem Paper", &[record("b", "y")]);

        assert_eq!(cache.clear_all(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_for_resource_type_keeps_other_types() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        cache.set(&filters, "CT Paper", &[record("a", "x")]);
        cache.set(&FilterSet::new().with_year("2nd Year"), "CT Paper", &[record("b", "x")]);
        cache.set(&filters, "Sem Paper", &[record("c", "y")]);

        assert_eq!(cache.clear_for_resource_type("CT Paper"), 2);
        assert!(cache.get(&filters, "CT Paper").is_none());
        assert!(cache.get(&filters, "Sem Paper").is_some());
    }

    #[test]
    fn test_quota_error_is_absorbed() {
        let backend = Arc::new(MemoryBackend::with_quota(16));
        let cache = ResultCache::new(backend, Arc::new(ManualClock::new(START_MS)));
        let filters = FilterSet::new().with_year("1st Year");

        cache.set(&filters, "CT Paper", &[record("a", "a long title")]);

        assert!(cache.get(&filters, "CT Paper").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_reports_occupancy() {
        let (cache, _, _) = manual_cache();
        let filters = FilterSet::new().with_year("1st Year");
        cache.set(&filters, "CT Paper", &[record("a", "x")]);
        cache.get(&filters, "CT Paper");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_entries, 1);
        assert!(stats.total_size > 0);
    }
}
