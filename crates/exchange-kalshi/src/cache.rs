//! Short-lived cache for read-only API responses.
//!
//! Entries are keyed by method, URL and canonicalized query string and hold
//! the raw JSON payload. Expiry is checked lazily on lookup; there is no
//! background sweeper. Only GET responses are ever stored.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

// =============================================================================
// Cache Key
// =============================================================================

/// Canonical cache key for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from method, URL and query parameters.
    ///
    /// Parameters are sorted so that the same logical query maps to the same
    /// key regardless of the order the caller supplied them in.
    #[must_use]
    pub fn new(method: &str, url: &str, query: &[(String, String)]) -> Self {
        let mut params: Vec<_> = query.iter().collect();
        params.sort();

        let canonical = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        Self(format!("{}:{url}?{canonical}", method.to_ascii_uppercase()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Response Cache
// =============================================================================

#[derive(Debug)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored, including any not yet evicted.
    pub entries: usize,
    /// Configured time-to-live.
    pub ttl: Duration,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that missed or found an expired entry.
    pub misses: u64,
}

/// TTL cache of JSON payloads.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    /// Creates a cache. A zero TTL disables caching entirely.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Returns true if entries are ever stored.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a payload, evicting it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() >= self.ttl);

        match expired {
            Some(false) => {
                inner.hits += 1;
                inner.entries.get(key).map(|entry| entry.payload.clone())
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores a payload, replacing any previous entry for the key.
    pub fn put(&self, key: CacheKey, payload: Value) {
        if !self.is_enabled() {
            return;
        }

        self.inner.lock().entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - inner.entries.len()
    }

    /// Returns entry count, TTL and hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ttl: self.ttl,
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(url: &str) -> CacheKey {
        CacheKey::new("GET", url, &[])
    }

    // ==================== Key Tests ====================

    #[test]
    fn test_key_sorts_query_params() {
        let a = CacheKey::new(
            "GET",
            "https://x/markets",
            &[
                ("status".to_string(), "open".to_string()),
                ("limit".to_string(), "200".to_string()),
            ],
        );
        let b = CacheKey::new(
            "get",
            "https://x/markets",
            &[
                ("limit".to_string(), "200".to_string()),
                ("status".to_string(), "open".to_string()),
            ],
        );
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "GET:https://x/markets?limit=200&status=open");
    }

    #[test]
    fn test_key_distinguishes_query_values() {
        let a = CacheKey::new("GET", "/m", &[("cursor".to_string(), "a".to_string())]);
        let b = CacheKey::new("GET", "/m", &[("cursor".to_string(), "b".to_string())]);
        assert_ne!(a, b);
    }

    // ==================== TTL Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_get_before_ttl_returns_payload() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        let payload = json!({"markets": [{"ticker": "T"}]});
        cache.put(key("/markets"), payload.clone());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&key("/markets")), Some(payload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_misses_and_evicts() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        cache.put(key("/markets"), json!({"a": 1}));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get(&key("/markets")), None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_replaces_entry() {
        let cache = ResponseCache::default();
        cache.put(key("/a"), json!(1));
        cache.put(key("/a"), json!(2));
        assert_eq!(cache.get(&key("/a")), Some(json!(2)));
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_disables_cache() {
        let cache = ResponseCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.put(key("/a"), json!(1));
        assert_eq!(cache.get(&key("/a")), None);
    }

    // ==================== Maintenance Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_stats_count_hits_and_misses() {
        let cache = ResponseCache::default();
        cache.put(key("/a"), json!(1));

        cache.get(&key("/a"));
        cache.get(&key("/a"));
        cache.get(&key("/b"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.ttl, DEFAULT_CACHE_TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_fresh_entries() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.put(key("/old"), json!(1));
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.put(key("/new"), json!(2));
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&key("/new")), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_removes_all() {
        let cache = ResponseCache::default();
        cache.put(key("/a"), json!(1));
        cache.put(key("/b"), json!(2));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
