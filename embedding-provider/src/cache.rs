use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single-map LRU with an auxiliary access-order list, avoiding the
/// "scan all entries for oldest" O(n) eviction pattern (§9 design note).
/// Keyed by `(model_name, text)`, entries carry a wall-clock TTL checked
/// lazily on read.
pub struct EmbeddingCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<(String, String), Entry>,
    access_order: Vec<(String, String)>,
}

struct Entry {
    vector: Vec<f32>,
    inserted_at: Instant,
}

impl EmbeddingCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::with_capacity(capacity),
            access_order: Vec::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = (model.to_string(), text.to_string());
        let expired = match self.entries.get(&key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(&key);
            self.access_order.retain(|k| k != &key);
            return None;
        }

        self.touch(&key);
        self.entries.get(&key).map(|e| e.vector.clone())
    }

    pub fn set(&mut self, model: &str, text: &str, vector: Vec<f32>) {
        let key = (model.to_string(), text.to_string());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.entries.insert(
            key.clone(),
            Entry {
                vector,
                inserted_at: Instant::now(),
            },
        );
        self.touch(&key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &(String, String)) {
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.clone());
    }

    fn evict_oldest(&mut self) {
        if self.access_order.is_empty() {
            return;
        }
        let oldest = self.access_order.remove(0);
        self.entries.remove(&oldest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_the_same_vector() {
        let mut cache = EmbeddingCache::new(10, Duration::from_secs(60));
        cache.set("model-a", "hello", vec![0.1, 0.2, 0.3]);
        assert_eq!(cache.get("model-a", "hello"), Some(vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let mut cache = EmbeddingCache::new(10, Duration::from_millis(1));
        cache.set("model-a", "hello", vec![0.1]);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("model-a", "hello"), None);
    }

    #[test]
    fn eviction_drops_the_oldest_entry_when_full() {
        let mut cache = EmbeddingCache::new(2, Duration::from_secs(60));
        cache.set("m", "a", vec![1.0]);
        cache.set("m", "b", vec![2.0]);
        cache.set("m", "c", vec![3.0]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("m", "a"), None);
        assert_eq!(cache.get("m", "b"), Some(vec![2.0]));
        assert_eq!(cache.get("m", "c"), Some(vec![3.0]));
    }

    #[test]
    fn size_never_exceeds_configured_capacity() {
        let mut cache = EmbeddingCache::new(3, Duration::from_secs(60));
        for i in 0..10 {
            cache.set("m", &i.to_string(), vec![i as f32]);
            assert!(cache.len() <= 3);
        }
    }
}
