//! Core cache implementation with configurable eviction policies
//!
//! A bounded map with a TTL per entry. Every removal (explicit delete,
//! eviction, lazy expiry on access, active purge) goes through one code path
//! so counters and logging stay consistent.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::config::{CacheConfig, EvictionPolicy, MAX_TTL};
use super::stats::{CacheStats, MetricsCollector};
use crate::error::CommonResult;
use crate::resilience::{Clock, SystemClock};

/// Snapshot of a live entry and its bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub access_count: u64,
    pub last_accessed_at: Instant,
}

impl<K, V> CacheEntry<K, V> {
    /// Time left before the entry expires, zero once it has
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Entry stored in the cache with metadata for eviction policies
#[derive(Debug, Clone)]
struct StoredEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    access_count: u64,
    last_accessed_at: Instant,
    /// Orders FIFO and breaks LFU ties
    insert_seq: u64,
    /// Orders LRU; instants can coincide, sequence numbers cannot
    access_seq: u64,
}

impl<V> StoredEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Deleted,
    Evicted,
    Expired,
}

/// Internal storage for cache entries
#[derive(Debug)]
struct CacheStorage<K, V> {
    entries: HashMap<K, StoredEntry<V>>,
    next_seq: u64,
}

impl<K, V> CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self { entries: HashMap::with_capacity(capacity), next_seq: 0 }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn victim(&self, policy: EvictionPolicy) -> Option<K> {
        let entries = self.entries.iter();
        let victim = match policy {
            EvictionPolicy::LRU => entries.min_by_key(|(_, entry)| entry.access_seq),
            EvictionPolicy::FIFO => entries.min_by_key(|(_, entry)| entry.insert_seq),
            EvictionPolicy::LFU => {
                entries.min_by_key(|(_, entry)| (entry.access_count, entry.insert_seq))
            }
        };
        victim.map(|(key, _)| key.clone())
    }
}

/// Generic thread-safe cache with configurable eviction policies
///
/// Clones share storage and counters.
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use figmagen_common::cache::{Cache, CacheConfig};
///
/// # fn main() -> Result<(), figmagen_common::CommonError> {
/// let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(100))?;
/// cache.set("key".to_string(), 42, None);
/// assert_eq!(cache.get("key"), Some(42));
/// # Ok(())
/// # }
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> CommonResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> std::fmt::Debug for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("len", &self.storage.read().entries.len())
            .finish()
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;
        Ok(Self {
            storage: Arc::new(RwLock::new(CacheStorage::new(config.max_size))),
            config,
            metrics: MetricsCollector::new(),
            clock,
        })
    }

    /// Insert or replace a value
    ///
    /// Inserting a new key into a full cache first evicts one entry according
    /// to the eviction policy; replacing an existing key never evicts. A
    /// replacement counts as a fresh insertion, so its access metadata and
    /// FIFO position start over. `ttl_override` of `None` or zero uses the
    /// configured TTL.
    pub fn set(&self, key: K, value: V, ttl_override: Option<Duration>) {
        let now = self.clock.now();
        let ttl = self.effective_ttl(ttl_override);
        let mut storage = self.storage.write();

        if !storage.entries.contains_key(&key) && storage.entries.len() >= self.config.max_size {
            self.evict_one(&mut storage);
        }

        let seq = storage.next_seq();
        let entry = StoredEntry {
            value,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
            last_accessed_at: now,
            insert_seq: seq,
            access_seq: seq,
        };
        storage.entries.insert(key, entry);

        if self.config.track_metrics {
            self.metrics.record_set();
        }
    }

    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or if the entry has expired,
    /// deleting expired entries on the way. A hit refreshes recency and
    /// frequency.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut storage = self.storage.write();

        if self.expire_if_stale(&mut storage, key, now) {
            self.record_miss();
            return None;
        }

        let seq = storage.next_seq();
        match storage.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed_at = now;
                entry.access_count += 1;
                entry.access_seq = seq;
                if self.config.track_metrics {
                    self.metrics.record_hit();
                }
                Some(entry.value.clone())
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Whether a live entry exists for `key`
    ///
    /// Deletes an expired entry like [`get`](Self::get) does, but leaves
    /// recency, frequency and hit/miss counters untouched.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut storage = self.storage.write();
        if self.expire_if_stale(&mut storage, key, now) {
            return false;
        }
        storage.entries.contains_key(key)
    }

    /// Get or insert with a generator function
    ///
    /// If the key holds a live value it is returned; otherwise `f` produces a
    /// value that is stored with the configured TTL.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = f();
        self.set(key, value.clone(), None);
        value
    }

    /// Remove an entry; returns whether one was present
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut storage = self.storage.write();
        self.remove_entry(&mut storage, key, Removal::Deleted).is_some()
    }

    /// Remove every entry; counters are kept
    pub fn clear(&self) {
        let mut storage = self.storage.write();
        let removed = storage.entries.len();
        storage.entries.clear();
        debug!(removed, "Cache cleared");
    }

    /// Extend a live entry's expiry to `now + ttl` without reading it
    ///
    /// Recency and frequency are left alone. Returns false for absent or
    /// expired keys.
    pub fn touch<Q>(&self, key: &Q, ttl_override: Option<Duration>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let ttl = self.effective_ttl(ttl_override);
        let mut storage = self.storage.write();

        if self.expire_if_stale(&mut storage, key, now) {
            return false;
        }
        match storage.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = now + ttl;
                true
            }
            None => false,
        }
    }

    /// Remove every expired entry
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut storage = self.storage.write();

        let expired: Vec<K> = storage
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(&mut storage, key, Removal::Expired);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.storage.read().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.config.max_size
    }

    pub fn remaining_capacity(&self) -> usize {
        self.config.max_size.saturating_sub(self.len())
    }

    /// Keys of live entries
    pub fn keys(&self) -> Vec<K> {
        let now = self.clock.now();
        self.storage
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Values of live entries
    pub fn values(&self) -> Vec<V> {
        let now = self.clock.now();
        self.storage
            .read()
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Snapshots of live entries with their metadata, oldest insertion first
    pub fn entries(&self) -> Vec<CacheEntry<K, V>> {
        let now = self.clock.now();
        let storage = self.storage.read();
        let mut live: Vec<(&K, &StoredEntry<V>)> =
            storage.entries.iter().filter(|(_, entry)| !entry.is_expired(now)).collect();
        live.sort_by_key(|(_, entry)| entry.insert_seq);

        live.into_iter()
            .map(|(key, entry)| CacheEntry {
                key: key.clone(),
                value: entry.value.clone(),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                access_count: entry.access_count,
                last_accessed_at: entry.last_accessed_at,
            })
            .collect()
    }

    /// Rough size of the stored entries in bytes
    ///
    /// Counts the inline size of keys and entries plus per-slot map overhead.
    /// Heap data owned by keys or values is not followed.
    pub fn memory_usage_estimate(&self) -> usize {
        let storage = self.storage.read();
        let slot = mem::size_of::<K>() + mem::size_of::<StoredEntry<V>>() + mem::size_of::<u64>();
        mem::size_of::<CacheStorage<K, V>>() + storage.entries.capacity() * slot
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_size)
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Overrides are clamped to `MAX_TTL` so `now + ttl` cannot overflow
    fn effective_ttl(&self, ttl_override: Option<Duration>) -> Duration {
        ttl_override.filter(|ttl| !ttl.is_zero()).unwrap_or(self.config.ttl).min(MAX_TTL)
    }

    fn record_miss(&self) {
        if self.config.track_metrics {
            self.metrics.record_miss();
        }
    }

    /// Delete `key` if it is stored but expired; returns true if it was
    fn expire_if_stale<Q>(&self, storage: &mut CacheStorage<K, V>, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let stale = storage.entries.get(key).is_some_and(|entry| entry.is_expired(now));
        if stale {
            self.remove_entry(storage, key, Removal::Expired);
        }
        stale
    }

    /// Evict one entry based on the configured policy
    fn evict_one(&self, storage: &mut CacheStorage<K, V>) {
        if let Some(key) = storage.victim(self.config.eviction_policy) {
            self.remove_entry(storage, &key, Removal::Evicted);
            debug!(policy = %self.config.eviction_policy, "Evicted cache entry");
        }
    }

    fn remove_entry<Q>(
        &self,
        storage: &mut CacheStorage<K, V>,
        key: &Q,
        reason: Removal,
    ) -> Option<StoredEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = storage.entries.remove(key)?;
        if self.config.track_metrics {
            match reason {
                Removal::Deleted => self.metrics.record_delete(),
                Removal::Evicted => self.metrics.record_eviction(),
                Removal::Expired => self.metrics.record_expiration(),
            }
        }
        trace!(reason = ?reason, "Removed cache entry");
        Some(removed)
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::core.
    use std::thread;

    use super::*;
    use crate::resilience::MockClock;

    fn mock_cache(
        max_size: usize,
        policy: EvictionPolicy,
    ) -> (Cache<String, i32, MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = CacheConfig::builder()
            .max_size(max_size)
            .ttl(Duration::from_secs(10))
            .eviction_policy(policy)
            .build();
        (Cache::with_clock(config, clock.clone()).unwrap(), clock)
    }

    /// Validates `Cache::new` behavior for the invalid configuration scenario.
    ///
    /// Assertions:
    /// - Ensures a zero `max_size` is rejected.
    #[test]
    fn test_cache_new_rejects_invalid_config() {
        let result: CommonResult<Cache<String, i32>> = Cache::new(CacheConfig::lru(0));
        assert!(result.is_err());
    }

    /// Validates `Cache::set` behavior for the set and get scenario.
    ///
    /// Assertions:
    /// - Confirms `cache.get("key1")` equals `Some(42)`.
    /// - Confirms `cache.get("key3")` equals `None`.
    /// - Confirms `cache.len()` equals `2`.
    #[test]
    fn test_cache_set_and_get() {
        let (cache, _) = mock_cache(10, EvictionPolicy::LRU);

        cache.set("key1".to_string(), 42, None);
        cache.set("key2".to_string(), 84, None);

        assert_eq!(cache.get("key1"), Some(42));
        assert_eq!(cache.get("key2"), Some(84));
        assert_eq!(cache.get("key3"), None);
        assert_eq!(cache.len(), 2);
    }

    /// Validates `Cache::set` behavior for the cache update existing scenario.
    ///
    /// Assertions:
    /// - Confirms a full cache replaces an existing key without evicting.
    #[test]
    fn test_cache_update_existing_never_evicts() {
        let (cache, _) = mock_cache(2, EvictionPolicy::LRU);

        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        cache.set("a".to_string(), 10, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    /// Validates TTL expiry for the lazy expiry scenario.
    ///
    /// Assertions:
    /// - Ensures the entry is readable just before expiry and gone at the
    ///   expiry instant.
    /// - Confirms the expired entry was deleted and counted.
    #[test]
    fn test_cache_ttl_expiration() {
        let (cache, clock) = mock_cache(10, EvictionPolicy::LRU);
        cache.set("key".to_string(), 1, None);

        clock.advance(Duration::from_millis(9_999));
        assert_eq!(cache.get("key"), Some(1));

        clock.advance_millis(1);
        assert_eq!(cache.get("key"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    /// Validates the per-entry TTL override scenario.
    ///
    /// Assertions:
    /// - Confirms an override shortens the lifetime.
    /// - Confirms a zero override falls back to the configured TTL.
    #[test]
    fn test_cache_ttl_override() {
        let (cache, clock) = mock_cache(10, EvictionPolicy::LRU);
        cache.set("short".to_string(), 1, Some(Duration::from_secs(1)));
        cache.set("zero".to_string(), 2, Some(Duration::ZERO));

        clock.advance(Duration::from_secs(2));
        assert!(!cache.has("short"));
        assert!(cache.has("zero"));
    }

    /// Validates `Cache::set` and `Cache::touch` behavior for the unbounded
    /// override scenario.
    ///
    /// Assertions:
    /// - Ensures `Duration::MAX` as an override neither panics nor expires
    ///   the entry.
    /// - Ensures the clamped entry still expires after `MAX_TTL`.
    #[test]
    fn test_cache_huge_ttl_override_is_clamped() {
        let (cache, clock) = mock_cache(10, EvictionPolicy::LRU);
        cache.set("forever".to_string(), 1, Some(Duration::MAX));
        cache.set("touched".to_string(), 2, None);
        assert!(cache.touch("touched", Some(Duration::MAX)));

        clock.advance(Duration::from_secs(3600));
        assert_eq!(cache.get("forever"), Some(1));
        assert_eq!(cache.get("touched"), Some(2));

        clock.advance(MAX_TTL);
        assert!(!cache.has("forever"));
        assert!(!cache.has("touched"));
    }

    /// Validates `Cache::has` behavior for the metadata neutrality scenario.
    ///
    /// Assertions:
    /// - Ensures `has` on the LRU candidate does not save it from eviction.
    /// - Confirms `has` records no hits or misses.
    #[test]
    fn test_cache_has_does_not_touch_recency() {
        let (cache, _) = mock_cache(2, EvictionPolicy::LRU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);

        assert!(cache.has("a"));
        assert!(!cache.has("missing"));
        cache.set("c".to_string(), 3, None);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    /// Validates the LRU eviction scenario.
    ///
    /// Assertions:
    /// - Ensures reading `a` protects it and `b` is evicted instead.
    #[test]
    fn test_cache_lru_eviction() {
        let (cache, _) = mock_cache(2, EvictionPolicy::LRU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c".to_string(), 3, None);

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    /// Validates the FIFO eviction scenario.
    ///
    /// Assertions:
    /// - Ensures the first inserted key goes first regardless of reads.
    #[test]
    fn test_cache_fifo_eviction() {
        let (cache, _) = mock_cache(2, EvictionPolicy::FIFO);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c".to_string(), 3, None);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    /// Validates the FIFO re-set scenario.
    ///
    /// Assertions:
    /// - Ensures re-setting a key moves it to the back of the queue.
    #[test]
    fn test_cache_fifo_reset_moves_to_back() {
        let (cache, _) = mock_cache(2, EvictionPolicy::FIFO);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        cache.set("a".to_string(), 11, None);
        cache.set("c".to_string(), 3, None);

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
    }

    /// Validates the LFU eviction scenario.
    ///
    /// Assertions:
    /// - Ensures the least read key is evicted.
    /// - Ensures ties go to the oldest insertion.
    #[test]
    fn test_cache_lfu_eviction() {
        let (cache, _) = mock_cache(3, EvictionPolicy::LFU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        cache.set("c".to_string(), 3, None);
        for _ in 0..3 {
            cache.get("a");
        }
        cache.get("c");

        cache.set("d".to_string(), 4, None);
        assert!(!cache.has("b"));

        // d has never been read
        cache.set("e".to_string(), 5, None);
        assert!(!cache.has("d"));
        assert!(cache.has("a"));
        assert!(cache.has("c"));

        let (cache, _) = mock_cache(2, EvictionPolicy::LFU);
        cache.set("x".to_string(), 1, None);
        cache.set("y".to_string(), 2, None);
        cache.set("z".to_string(), 3, None);
        assert!(!cache.has("x"));
        assert!(cache.has("y"));
    }

    /// Validates `Cache::touch` behavior for the expiry extension scenario.
    ///
    /// Assertions:
    /// - Ensures a touched entry outlives its original TTL.
    /// - Ensures touching leaves LRU order alone.
    /// - Ensures touching an absent key returns false.
    #[test]
    fn test_cache_touch() {
        let (cache, clock) = mock_cache(2, EvictionPolicy::LRU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);

        clock.advance(Duration::from_secs(8));
        assert!(cache.touch("a", Some(Duration::from_secs(30))));
        assert!(!cache.touch("missing", None));

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);

        let (cache, _) = mock_cache(2, EvictionPolicy::LRU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        assert!(cache.touch("a", None));
        cache.set("c".to_string(), 3, None);
        assert!(!cache.has("a"));
    }

    /// Validates `Cache::delete` and `Cache::clear` behavior.
    ///
    /// Assertions:
    /// - Confirms `delete` reports whether an entry existed.
    /// - Confirms `clear` empties the cache but keeps counters.
    #[test]
    fn test_cache_delete_and_clear() {
        let (cache, _) = mock_cache(10, EvictionPolicy::LRU);
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, None);
        cache.get("a");

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));

        cache.clear();
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.hits, 1);

        cache.reset_stats();
        assert_eq!(cache.stats().sets, 0);
    }

    /// Validates `Cache::purge_expired` behavior for the active expiry
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms only expired entries are purged and the count is returned.
    #[test]
    fn test_cache_purge_expired() {
        let (cache, clock) = mock_cache(10, EvictionPolicy::LRU);
        cache.set("short1".to_string(), 1, Some(Duration::from_secs(1)));
        cache.set("short2".to_string(), 2, Some(Duration::from_secs(1)));
        cache.set("long".to_string(), 3, None);

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.stats().expirations, 2);
    }

    /// Validates the introspection helpers.
    ///
    /// Assertions:
    /// - Confirms capacity accounting, live-only listings and entry metadata.
    #[test]
    fn test_cache_introspection() {
        let (cache, clock) = mock_cache(3, EvictionPolicy::LRU);
        let start = clock.now();
        cache.set("a".to_string(), 1, None);
        cache.set("b".to_string(), 2, Some(Duration::from_secs(1)));
        assert_eq!(cache.remaining_capacity(), 1);
        assert!(!cache.is_full());

        clock.advance(Duration::from_secs(1));
        cache.get("a");
        let mut values = cache.values();
        values.sort();
        assert_eq!(values, vec![1]);

        let entries = cache.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[0].access_count, 1);
        assert_eq!(entries[0].created_at, start);
        assert_eq!(entries[0].expires_at, start + Duration::from_secs(10));
        assert_eq!(entries[0].ttl_remaining(clock.now()), Duration::from_secs(9));
        assert!(cache.memory_usage_estimate() > 0);
    }

    /// Validates `Cache::get_or_insert_with` behavior.
    ///
    /// Assertions:
    /// - Ensures the generator runs only on a miss.
    #[test]
    fn test_cache_get_or_insert_with() {
        let (cache, _) = mock_cache(10, EvictionPolicy::LRU);
        let mut calls = 0;

        let first = cache.get_or_insert_with("key".to_string(), || {
            calls += 1;
            42
        });
        let second = cache.get_or_insert_with("key".to_string(), || {
            calls += 1;
            0
        });

        assert_eq!((first, second), (42, 42));
        assert_eq!(calls, 1);
    }

    /// Validates `Cache::set` behavior for the concurrent access scenario.
    ///
    /// Assertions:
    /// - Ensures the size bound holds across concurrent writers.
    #[test]
    fn test_cache_concurrent_access() {
        let cache: Cache<String, usize> = Cache::new(CacheConfig::lru(50)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{}-{}", t, i), i, None);
                        let _ = cache.get(&format!("{}-{}", t, i / 2));
                        assert!(cache.len() <= 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
        assert_eq!(cache.stats().sets, 800);
    }
}
