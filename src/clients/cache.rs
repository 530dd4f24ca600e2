//! In-memory front for the Catalog Client's two-tier cache (§4.2). The
//! persistent tier is `CatalogCacheRepository`; this is a small bounded
//! map in front of it so repeated lookups within a single run skip the
//! store round-trip entirely.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 256;

pub struct MemoryCache {
    capacity: usize,
    entries: Mutex<(HashMap<String, String>, VecDeque<String>)>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new((HashMap::new(), VecDeque::new())),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.0.get(key).cloned()
    }

    pub fn put(&self, key: String, value: String) {
        let mut guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (map, order) = &mut *guard;
        if !map.contains_key(&key) {
            order.push_back(key.clone());
        }
        map.insert(key, value);
        while map.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                map.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let cache = MemoryCache::new(2);
        cache.put("a".to_string(), "1".to_string());
        cache.put("b".to_string(), "2".to_string());
        cache.put("c".to_string(), "3".to_string());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some("2".to_string()));
        assert_eq!(cache.get("c"), Some("3".to_string()));
    }
}
