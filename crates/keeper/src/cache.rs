//! LRU record cache for hot data.
//!
//! The [`RecordCache`] is a bounded in-memory view of records a keeper
//! believes were durably accepted by its inner store. It never suspends:
//! every method takes the lock, does its bookkeeping and returns.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::{CacheOptions, RecordCacheConfig};
use crate::metrics::CacheMetrics;

struct CachedValue {
    value: Bytes,
    inserted_at: Instant,
}

struct CacheState {
    entries: LruCache<Bytes, CachedValue>,
    /// Total size of cached keys and values.
    bytes: usize,
}

impl CacheState {
    fn remove(&mut self, key: &[u8]) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.bytes -= key.len() + entry.value.len();
                true
            }
            None => false,
        }
    }
}

/// LRU cache for record values.
pub struct RecordCache {
    state: Mutex<CacheState>,
    max_bytes: Option<usize>,
    max_age: Option<Duration>,
    clone_on_access: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rollbacks: AtomicU64,
    skipped_writes: AtomicU64,
    metrics: CacheMetrics,
}

impl RecordCache {
    /// Create a new cache from `config`.
    ///
    /// A zero entry limit is treated as one.
    pub fn new(config: &impl RecordCacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_entries()).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(cap),
                bytes: 0,
            }),
            max_bytes: config.max_bytes(),
            max_age: config.max_age(),
            clone_on_access: config.clone_on_access(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            skipped_writes: AtomicU64::new(0),
            metrics: CacheMetrics::default(),
        }
    }

    /// Create a cache holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&CacheOptions::default().with_max_entries(capacity))
    }

    /// Get a record, promoting it to most recently used.
    ///
    /// Expired entries are dropped and reported as misses.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let mut state = self.state.lock();

        if self.is_expired(state.entries.peek(key)) {
            state.remove(key);
        }

        if let Some(entry) = state.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.metrics.hits.increment(1);
            Some(self.copy(&entry.value))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.metrics.misses.increment(1);
            None
        }
    }

    /// Returns true if the cache currently holds exactly `value` for `key`.
    ///
    /// Does not touch recency or hit counters.
    pub fn holds(&self, key: &[u8], value: &[u8]) -> bool {
        let state = self.state.lock();
        state
            .entries
            .peek(key)
            .is_some_and(|entry| !self.is_expired(Some(entry)) && entry.value == value)
    }

    /// Insert a record, evicting least recently used records to stay in bounds.
    ///
    /// A record larger than the byte bound is not cached, and any previous
    /// value for its key is dropped.
    pub fn insert(&self, key: Bytes, value: Bytes) {
        let size = key.len() + value.len();
        let mut state = self.state.lock();

        if self.max_bytes.is_some_and(|max| size > max) {
            state.remove(&key);
            return;
        }

        let entry = CachedValue {
            value: self.copy(&value),
            inserted_at: Instant::now(),
        };
        let mut evicted = 0;
        if let Some((old_key, old)) = state.entries.push(key.clone(), entry) {
            state.bytes -= old_key.len() + old.value.len();
            if old_key != key {
                evicted += 1;
            }
        }
        state.bytes += size;

        if let Some(max) = self.max_bytes {
            while state.bytes > max {
                let Some((old_key, old)) = state.entries.pop_lru() else {
                    break;
                };
                state.bytes -= old_key.len() + old.value.len();
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            self.metrics.evictions.increment(evicted);
        }
    }

    /// Remove a record. Returns true if it was cached.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.state.lock().remove(key)
    }

    /// Remove a speculative record after its write failed.
    pub fn rollback(&self, key: &[u8]) {
        self.remove(key);
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        self.metrics.rollbacks.increment(1);
    }

    /// Count writes skipped because the cache already held their value.
    pub fn record_skipped_writes(&self, count: u64) {
        if count > 0 {
            self.skipped_writes.fetch_add(count, Ordering::Relaxed);
            self.metrics.skipped_writes.increment(count);
        }
    }

    /// Check if a record is cached.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Get the number of cached records.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of cached keys and values in bytes.
    pub fn bytes(&self) -> usize {
        self.state.lock().bytes
    }

    /// Clear the cache.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.bytes = 0;
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let state = self.state.lock();

        CacheStats {
            capacity: state.entries.cap().get(),
            size: state.entries.len(),
            bytes: state.bytes,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            hit_rate: if hits + misses > 0 {
                (hits as f64 / (hits + misses) as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    fn is_expired(&self, entry: Option<&CachedValue>) -> bool {
        match (self.max_age, entry) {
            (Some(max_age), Some(entry)) => entry.inserted_at.elapsed() >= max_age,
            _ => false,
        }
    }

    fn copy(&self, value: &Bytes) -> Bytes {
        if self.clone_on_access {
            Bytes::copy_from_slice(value)
        } else {
            value.clone()
        }
    }
}

impl core::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordCache")
            .field("max_bytes", &self.max_bytes)
            .field("max_age", &self.max_age)
            .field("clone_on_access", &self.clone_on_access)
            .finish_non_exhaustive()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Maximum number of cached records.
    pub capacity: usize,
    /// Current number of cached records.
    pub size: usize,
    /// Current size of cached keys and values in bytes.
    pub bytes: usize,
    /// Cache hits.
    pub hits: u64,
    /// Cache misses.
    pub misses: u64,
    /// Records evicted to stay within bounds.
    pub evictions: u64,
    /// Speculative records removed after failed writes.
    pub rollbacks: u64,
    /// Writes skipped because the value was already cached.
    pub skipped_writes: u64,
    /// Hit rate percentage.
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(n: u8) -> Bytes {
        Bytes::copy_from_slice(&[n; 4])
    }

    #[test]
    fn test_cache_insert_get() {
        let cache = RecordCache::with_capacity(10);

        cache.insert(key(1), Bytes::from_static(b"hello world"));
        assert_eq!(cache.get(&key(1)), Some(Bytes::from_static(b"hello world")));
        assert_eq!(cache.get(&key(2)), None);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = RecordCache::with_capacity(2);

        cache.insert(key(1), Bytes::from_static(b"one"));
        cache.insert(key(2), Bytes::from_static(b"two"));

        // Touch 1 so 2 becomes least recently used
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), Bytes::from_static(b"three"));

        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_is_not_eviction() {
        let cache = RecordCache::with_capacity(2);

        cache.insert(key(1), Bytes::from_static(b"one"));
        cache.insert(key(1), Bytes::from_static(b"uno"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), 4 + 3);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_holds_compares_values() {
        let cache = RecordCache::with_capacity(10);
        cache.insert(key(1), Bytes::from_static(b"data"));

        assert!(cache.holds(&key(1), b"data"));
        assert!(!cache.holds(&key(1), b"other"));
        assert!(!cache.holds(&key(2), b"data"));
        // holds() is not a read
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_byte_bound_evicts_lru() {
        let cache = RecordCache::new(&CacheOptions::default().with_max_bytes(20));

        cache.insert(key(1), Bytes::from_static(b"aaaaaa")); // 10 bytes
        cache.insert(key(2), Bytes::from_static(b"bbbbbb")); // 20 bytes
        cache.insert(key(3), Bytes::from_static(b"cccccc")); // evicts 1

        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert_eq!(cache.bytes(), 20);
    }

    #[test]
    fn test_oversized_record_is_not_cached() {
        let cache = RecordCache::new(&CacheOptions::default().with_max_bytes(8));

        cache.insert(key(1), Bytes::from_static(b"ok"));
        cache.insert(key(1), Bytes::from_static(b"far too large"));

        // The stale value must not survive
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_max_age_expires_entries() {
        let cache = RecordCache::new(
            &CacheOptions::default().with_max_age(Duration::from_millis(20)),
        );

        cache.insert(key(1), Bytes::from_static(b"data"));
        assert!(cache.get(&key(1)).is_some());

        std::thread::sleep(Duration::from_millis(40));

        assert!(!cache.holds(&key(1), b"data"));
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_clone_on_access_copies() {
        let cache = RecordCache::new(&CacheOptions::default().with_clone_on_access(true));
        let value = Bytes::from(b"shared".to_vec());

        cache.insert(key(1), value.clone());
        let cached = cache.get(&key(1)).unwrap();

        assert_eq!(cached, value);
        assert_ne!(cached.as_ptr(), value.as_ptr());

        let shared = RecordCache::with_capacity(4);
        shared.insert(key(1), value.clone());
        assert_eq!(shared.get(&key(1)).unwrap().as_ptr(), value.as_ptr());
    }

    #[test]
    fn test_cache_stats() {
        let cache = RecordCache::with_capacity(10);

        cache.insert(key(1), Bytes::from_static(b"data"));

        cache.get(&key(1)); // hit
        cache.get(&key(2)); // miss
        cache.rollback(&key(1));
        cache.record_skipped_writes(2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 50.0);
        assert_eq!(stats.rollbacks, 1);
        assert_eq!(stats.skipped_writes, 2);
        assert_eq!(stats.size, 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, usize),
        Remove(u8),
        Get(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, 0usize..48).prop_map(|(k, len)| Op::Insert(k, len)),
            (0u8..16).prop_map(Op::Remove),
            (0u8..16).prop_map(Op::Get),
        ]
    }

    proptest! {
        #[test]
        fn proptest_bounds_hold(
            max_entries in 1usize..8,
            max_bytes in 1usize..64,
            ops in proptest::collection::vec(op(), 0..64),
        ) {
            let cache = RecordCache::new(
                &CacheOptions::default()
                    .with_max_entries(max_entries)
                    .with_max_bytes(max_bytes),
            );

            for op in ops {
                match op {
                    Op::Insert(k, len) => cache.insert(key(k), Bytes::from(vec![k; len])),
                    Op::Remove(k) => {
                        cache.remove(&key(k));
                    }
                    Op::Get(k) => {
                        cache.get(&key(k));
                    }
                }

                prop_assert!(cache.len() <= max_entries);
                prop_assert!(cache.bytes() <= max_bytes);

                let state = cache.state.lock();
                let total: usize = state.entries.iter().map(|(k, v)| k.len() + v.value.len()).sum();
                prop_assert_eq!(total, state.bytes);
            }
        }
    }
}
