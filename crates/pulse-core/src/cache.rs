//! # LRU Cache
//!
//! Bounded memo for repeated predictions. Feedback comments repeat more
//! than one would expect ("great", "ok", "thanks"), and classification
//! walks every label, so the engine keeps recent answers here keyed by
//! normalized text.
//!
//! Recency is tracked with a logical clock rather than wall time. A second
//! map from tick to key keeps eviction at `O(log n)`.

use std::collections::BTreeMap;

/// Default number of memoized predictions.
pub const DEFAULT_CACHE_SIZE: usize = 1024;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    tick: u64,
}

/// Least-recently-used cache with hit/miss accounting.
#[derive(Debug)]
pub struct LruCache<K: Ord + Clone, V: Clone> {
    entries: BTreeMap<K, Entry<V>>,
    /// tick -> key, oldest first.
    recency: BTreeMap<u64, K>,
    capacity: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

/// Memo of normalized comment text -> emotion label.
pub type PredictionCache = LruCache<String, String>;

impl<K: Ord + Clone, V: Clone> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl<K: Ord + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            recency: BTreeMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a value, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.recency.remove(&entry.tick);
                self.recency.insert(tick, key.clone());
                entry.tick = tick;
                self.hits = self.hits.saturating_add(1);
                Some(entry.value.clone())
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                None
            }
        }
    }

    /// Insert or replace a value, evicting the least recently used entry
    /// when full.
    pub fn insert(&mut self, key: K, value: V) {
        let tick = self.tick();

        if let Some(old) = self.entries.remove(&key) {
            self.recency.remove(&old.tick);
        } else if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.recency.insert(tick, key.clone());
        self.entries.insert(key, Entry { value, tick });
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits.saturating_add(self.misses);
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate_percent: if lookups == 0 {
                0
            } else {
                (self.hits.saturating_mul(100) / lookups) as u8
            },
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock = self.clock.saturating_add(1);
        self.clock
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            self.entries.remove(&key);
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Integer percentage, 0-100.
    pub hit_rate_percent: u8,
}

// =============================================================================
// TESTS
// =============================================================================
