use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Consider a cached response stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

#[derive(Default)]
struct Entries {
    bodies: HashMap<String, CachedData<Vec<u8>>>,
    // Oldest first; used for eviction.
    order: VecDeque<String>,
    bytes: usize,
}

impl Entries {
    fn remove(&mut self, key: &str) {
        if let Some(old) = self.bodies.remove(key) {
            self.bytes -= old.data.len();
            self.order.retain(|k| k != key);
        }
    }
}

/// Memory-bounded cache of response bodies keyed by URL.
pub struct ResponseCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Store a body, evicting the oldest entries to stay under capacity.
    /// Bodies larger than the whole budget are not cached.
    pub fn put(&self, key: &str, body: Vec<u8>) -> bool {
        if body.len() > self.capacity {
            debug!(key = %key, size = body.len(), "Response too large to cache");
            return false;
        }
        let mut entries = self.entries.lock();
        entries.remove(key);
        while entries.bytes + body.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            if let Some(evicted) = entries.bodies.remove(&oldest) {
                entries.bytes -= evicted.data.len();
            }
        }
        entries.bytes += body.len();
        entries.order.push_back(key.to_string());
        entries.bodies.insert(key.to_string(), CachedData::new(body));
        true
    }

    /// Fresh body for `key`, if cached.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock();
        entries
            .bodies
            .get(key)
            .filter(|cached| !cached.is_stale())
            .map(|cached| cached.data.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.entries.lock().bytes
    }

    /// Drop every cached response. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.bodies.len();
        *entries = Entries::default();
        info!(removed, "Response cache purged");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_put_and_get() {
        let cache = ResponseCache::new(1024);
        assert!(cache.put("/a", b"alpha".to_vec()));
        assert_eq!(cache.get("/a"), Some(b"alpha".to_vec()));
        assert_eq!(cache.get("/missing"), None);
        assert!(cache.put("/a", b"al".to_vec()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), 2);
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let cache = ResponseCache::new(10);
        cache.put("/1", vec![0; 4]);
        cache.put("/2", vec![0; 4]);
        cache.put("/3", vec![0; 4]);
        assert_eq!(cache.get("/1"), None);
        assert!(cache.get("/2").is_some());
        assert!(cache.get("/3").is_some());
        assert_eq!(cache.size_bytes(), 8);
        assert!(!cache.put("/huge", vec![0; 11]));
    }

    #[test]
    fn test_purge_empties_cache() {
        let cache = ResponseCache::new(1024);
        cache.put("/a", vec![1, 2, 3]);
        cache.put("/b", vec![4]);
        assert_eq!(cache.purge(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }
}
