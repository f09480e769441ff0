use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// A resolved public URL with its expiry bookkeeping.
#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// In-memory cache for resolved public URLs, with failure tracking.
///
/// Successful resolutions are cached per storage path for a bounded
/// lifetime; failures are tracked separately so the get-URL flow can back
/// off instead of hammering an unhealthy backend. Entries expire lazily
/// on read and both maps are LRU-bounded. Clones share the same state.
pub struct UrlCache {
    /// Resolved URLs keyed by `bucket/file` path
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Most recent resolution failure per path
    failures: Arc<RwLock<LruCache<String, Instant>>>,
    default_ttl: Duration,
    failure_ttl: Duration,
}

impl UrlCache {
    /// Create a cache holding up to `capacity` URLs.
    ///
    /// `default_ttl` is the lifetime `put` applies; `failure_ttl` is how
    /// long a recorded failure suppresses retries (zero disables the
    /// suppression entirely).
    pub fn new(capacity: usize, default_ttl: Duration, failure_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1024).unwrap());
        UrlCache {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            failures: Arc::new(RwLock::new(LruCache::new(capacity))),
            default_ttl,
            failure_ttl,
        }
    }

    /// Look up an unexpired URL for a storage path.
    ///
    /// Expired entries are dropped on the way out and behave as absent.
    pub fn get(&self, path: &str) -> Option<String> {
        let mut entries = self.entries.write().ok()?;
        {
            let entry = entries.get(path)?;
            if entry.is_fresh() {
                return Some(entry.url.clone());
            }
        }
        entries.pop(path);
        None
    }

    /// Cache a resolved URL with the default lifetime.
    pub fn put(&self, path: &str, url: &str) {
        self.put_with_ttl(path, url, self.default_ttl);
    }

    /// Cache a resolved URL with an explicit lifetime.
    ///
    /// Overwrites unconditionally and clears any failure record for the
    /// same path; a successful resolution supersedes a prior failure.
    pub fn put_with_ttl(&self, path: &str, url: &str, ttl: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries.put(
                path.to_string(),
                CacheEntry {
                    url: url.to_string(),
                    created_at: Instant::now(),
                    ttl,
                },
            );
        }
        if let Ok(mut failures) = self.failures.write() {
            failures.pop(path);
        }
    }

    /// Record that resolving this path just failed.
    pub fn record_failure(&self, path: &str) {
        if let Ok(mut failures) = self.failures.write() {
            failures.put(path.to_string(), Instant::now());
        }
    }

    /// Whether this path failed to resolve within the failure window.
    ///
    /// Stale records are dropped on the way out.
    pub fn recent_failure(&self, path: &str) -> bool {
        let Ok(mut failures) = self.failures.write() else {
            return false;
        };
        {
            let Some(recorded) = failures.get(path) else {
                return false;
            };
            if recorded.elapsed() < self.failure_ttl {
                return true;
            }
        }
        failures.pop(path);
        false
    }

    /// Drop all cached URLs and failure records.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        if let Ok(mut failures) = self.failures.write() {
            failures.clear();
        }
    }

    /// Number of cached URLs, counting entries not yet lazily expired.
    pub fn len(&self) -> usize {
        self.entries.read().ok().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for UrlCache {
    fn clone(&self) -> Self {
        UrlCache {
            entries: Arc::clone(&self.entries),
            failures: Arc::clone(&self.failures),
            default_ttl: self.default_ttl,
            failure_ttl: self.failure_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_ttl(ttl_ms: u64) -> UrlCache {
        UrlCache::new(
            16,
            Duration::from_millis(ttl_ms),
            Duration::from_millis(ttl_ms),
        )
    }

    #[test]
    fn test_round_trip() {
        let cache = cache_with_ttl(60_000);
        cache.put("docs/guide.pdf", "https://cdn.example/docs/guide.pdf");
        assert_eq!(
            cache.get("docs/guide.pdf"),
            Some("https://cdn.example/docs/guide.pdf".to_string())
        );
        assert_eq!(cache.get("docs/other.pdf"), None);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = cache_with_ttl(20);
        cache.put("docs/guide.pdf", "https://cdn.example/docs/guide.pdf");
        assert!(cache.get("docs/guide.pdf").is_some());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("docs/guide.pdf"), None);
        // Lazy expiry removed the entry entirely
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites() {
        let cache = cache_with_ttl(60_000);
        cache.put("docs/guide.pdf", "https://old.example");
        cache.put("docs/guide.pdf", "https://new.example");
        assert_eq!(
            cache.get("docs/guide.pdf"),
            Some("https://new.example".to_string())
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_override_beats_default() {
        let cache = UrlCache::new(16, Duration::from_millis(10), Duration::ZERO);
        cache.put_with_ttl("docs/guide.pdf", "https://cdn.example", Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("docs/guide.pdf").is_some());
    }

    #[test]
    fn test_failure_then_success() {
        let cache = cache_with_ttl(60_000);
        cache.record_failure("docs/guide.pdf");
        assert!(cache.recent_failure("docs/guide.pdf"));

        cache.put("docs/guide.pdf", "https://cdn.example/docs/guide.pdf");
        assert!(!cache.recent_failure("docs/guide.pdf"));
        assert!(cache.get("docs/guide.pdf").is_some());
    }

    #[test]
    fn test_failure_window_closes() {
        let cache = UrlCache::new(16, Duration::from_secs(60), Duration::from_millis(20));
        cache.record_failure("docs/guide.pdf");
        assert!(cache.recent_failure("docs/guide.pdf"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(!cache.recent_failure("docs/guide.pdf"));
    }

    #[test]
    fn test_zero_failure_ttl_disables_suppression() {
        let cache = UrlCache::new(16, Duration::from_secs(60), Duration::ZERO);
        cache.record_failure("docs/guide.pdf");
        assert!(!cache.recent_failure("docs/guide.pdf"));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = UrlCache::new(2, Duration::from_secs(60), Duration::ZERO);
        cache.put("a", "https://a.example");
        cache.put("b", "https://b.example");
        cache.put("c", "https://c.example");

        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let cache = cache_with_ttl(60_000);
        let clone = cache.clone();

        cache.put("docs/guide.pdf", "https://cdn.example");
        assert!(clone.get("docs/guide.pdf").is_some());

        clone.clear();
        assert!(cache.is_empty());
    }
}
