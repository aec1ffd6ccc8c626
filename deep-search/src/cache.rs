//! In-memory caches for page content, failed URLs and URL validity.
//!
//! The content cache is bounded by entry count and evicts in insertion
//! order: once full, the oldest `eviction_batch_size` entries are dropped
//! together. Re-inserting an existing URL replaces its text but keeps its
//! original position. The failed-URL set only shrinks on [`CacheStore::clear`].
//!
//! A [`CacheStore`] is owned by one engine and shared with its per-call
//! workers through an `Arc`. Critical sections are single map operations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::config::SearchConfig;
use crate::url_validator::UrlValidator;

/// Entry counts for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub content_entries: usize,
    pub failed_urls: usize,
}

#[derive(Default)]
struct ContentCache {
    entries: HashMap<String, String>,
    /// URLs in insertion order; front is oldest.
    order: VecDeque<String>,
}

/// Bounded URL→text cache, failed-URL set and URL-validity cache.
pub struct CacheStore {
    content: Mutex<ContentCache>,
    failed: Mutex<HashSet<String>>,
    validator: UrlValidator,
    max_entries: usize,
    eviction_batch: usize,
}

impl CacheStore {
    /// Create an empty store with explicit bounds.
    ///
    /// `eviction_batch` is clamped to `1..=max_entries`.
    pub fn new(max_entries: usize, eviction_batch: usize, validity_capacity: u64) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            content: Mutex::new(ContentCache::default()),
            failed: Mutex::new(HashSet::new()),
            validator: UrlValidator::new(validity_capacity.max(1)),
            max_entries,
            eviction_batch: eviction_batch.clamp(1, max_entries),
        }
    }

    /// Create a store sized from `config`.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.max_cache_size,
            config.eviction_batch_size,
            config.validity_cache_size,
        )
    }

    /// Cached text for `url`, if any.
    pub fn get_content(&self, url: &str) -> Option<String> {
        lock(&self.content).entries.get(url).cloned()
    }

    /// Cache `text` for `url`, evicting the oldest batch first if full.
    pub fn insert_content(&self, url: &str, text: String) {
        let mut cache = lock(&self.content);
        if let Some(existing) = cache.entries.get_mut(url) {
            *existing = text;
            return;
        }
        if cache.entries.len() >= self.max_entries {
            let mut evicted = 0;
            while evicted < self.eviction_batch {
                let Some(oldest) = cache.order.pop_front() else {
                    break;
                };
                cache.entries.remove(&oldest);
                evicted += 1;
            }
            tracing::debug!(evicted, "content cache eviction");
        }
        cache.entries.insert(url.to_owned(), text);
        cache.order.push_back(url.to_owned());
    }

    /// Whether `url` previously failed extraction.
    pub fn is_failed(&self, url: &str) -> bool {
        lock(&self.failed).contains(url)
    }

    /// Record `url` as failed; it will not be fetched again until cleared.
    pub fn mark_failed(&self, url: &str) {
        lock(&self.failed).insert(url.to_owned());
    }

    /// Memoised URL-validity check.
    pub fn is_valid_url(&self, url: &str) -> bool {
        self.validator.is_valid(url)
    }

    /// Whether `url` is worth fetching: valid and not previously failed.
    pub fn is_eligible(&self, url: &str) -> bool {
        self.is_valid_url(url) && !self.is_failed(url)
    }

    /// Drop all cached content, failed URLs and validity verdicts.
    pub fn clear(&self) {
        {
            let mut cache = lock(&self.content);
            cache.entries.clear();
            cache.order.clear();
        }
        lock(&self.failed).clear();
        self.validator.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            content_entries: lock(&self.content).entries.len(),
            failed_urls: lock(&self.failed).len(),
        }
    }
}

/// Lock a cache mutex, recovering the data if a holder panicked.
///
/// Caches are optimisations; a half-applied update is harmless.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_content() {
        let store = CacheStore::new(10, 2, 64);
        store.insert_content("https://a.com", "alpha".into());
        assert_eq!(store.get_content("https://a.com").as_deref(), Some("alpha"));
        assert!(store.get_content("https://b.com").is_none());
    }

    #[test]
    fn never_exceeds_max_entries() {
        let store = CacheStore::new(10, 3, 64);
        for i in 0..100 {
            store.insert_content(&format!("https://site{i}.com"), format!("text {i}"));
            assert!(store.stats().content_entries <= 10);
        }
    }

    #[test]
    fn evicts_oldest_batch_together() {
        let store = CacheStore::new(4, 2, 64);
        for i in 0..4 {
            store.insert_content(&format!("https://{i}.com"), i.to_string());
        }
        store.insert_content("https://new.com", "new".into());

        // Two oldest gone at once, two newer survive.
        assert!(store.get_content("https://0.com").is_none());
        assert!(store.get_content("https://1.com").is_none());
        assert!(store.get_content("https://2.com").is_some());
        assert!(store.get_content("https://3.com").is_some());
        assert!(store.get_content("https://new.com").is_some());
        assert_eq!(store.stats().content_entries, 3);
    }

    #[test]
    fn eviction_is_insertion_order_not_access_order() {
        let store = CacheStore::new(2, 1, 64);
        store.insert_content("https://first.com", "1".into());
        store.insert_content("https://second.com", "2".into());
        // Reading the oldest entry does not protect it.
        assert!(store.get_content("https://first.com").is_some());
        store.insert_content("https://third.com", "3".into());
        assert!(store.get_content("https://first.com").is_none());
        assert!(store.get_content("https://second.com").is_some());
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let store = CacheStore::new(2, 1, 64);
        store.insert_content("https://a.com", "old".into());
        store.insert_content("https://a.com", "new".into());
        assert_eq!(store.get_content("https://a.com").as_deref(), Some("new"));
        assert_eq!(store.stats().content_entries, 1);
    }

    #[test]
    fn failed_urls_are_remembered() {
        let store = CacheStore::new(10, 1, 64);
        assert!(store.is_eligible("https://down.com"));
        store.mark_failed("https://down.com");
        assert!(store.is_failed("https://down.com"));
        assert!(!store.is_eligible("https://down.com"));
        assert_eq!(store.stats().failed_urls, 1);
    }

    #[test]
    fn invalid_urls_are_not_eligible() {
        let store = CacheStore::new(10, 1, 64);
        assert!(!store.is_eligible("not a url"));
        assert!(!store.is_eligible("ftp://example.com"));
    }

    #[test]
    fn clear_resets_everything() {
        let store = CacheStore::new(10, 1, 64);
        store.insert_content("https://a.com", "alpha".into());
        store.mark_failed("https://b.com");
        store.clear();
        assert_eq!(
            store.stats(),
            CacheStats {
                content_entries: 0,
                failed_urls: 0
            }
        );
        assert!(store.is_eligible("https://b.com"));
    }

    #[test]
    fn eviction_batch_clamped_to_cache_size() {
        let store = CacheStore::new(2, 50, 64);
        store.insert_content("https://a.com", "a".into());
        store.insert_content("https://b.com", "b".into());
        store.insert_content("https://c.com", "c".into());
        assert_eq!(store.stats().content_entries, 1);
        assert!(store.get_content("https://c.com").is_some());
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CacheStore>();
    }
}
