//! Fingerprint-keyed result cache: strict LRU with optional TTL and two
//! orthogonal capacity ceilings (bytes, entry count).

use super::types::SynthesisResult;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// A single cache entry plus its bookkeeping fields.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: SynthesisResult,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    access_count: u64,
    memory_footprint: usize,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, CacheEntry>,
    /// MRU-first order of keys. Rebuilt lazily rather than kept perfectly
    /// in sync on every access; touched keys are moved to the front.
    order: Vec<String>,
    current_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl State {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.insert(0, k);
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.order.retain(|k| k != key);
        let entry = self.entries.remove(key)?;
        self.current_bytes = self.current_bytes.saturating_sub(entry.memory_footprint);
        Some(entry)
    }
}

/// Thread-safe LRU+TTL result cache. One mutex guards the hash table and
/// the LRU order together, matching the single-mutex cache policy.
pub struct ResultCache {
    state: Mutex<State>,
    max_bytes: usize,
    max_entries: Option<usize>,
    ttl_seconds: u64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl ResultCache {
    #[must_use]
    pub fn new(max_bytes: usize, max_entries: Option<usize>, ttl_seconds: u64) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_bytes,
            max_entries,
            ttl_seconds,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if self.ttl_seconds == 0 {
            return false;
        }
        (now - entry.created_at).num_seconds() >= self.ttl_seconds as i64
    }

    /// Probe the cache. Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<SynthesisResult> {
        let mut state = self.state.lock().expect("cache lock poisoned");
        let now = Utc::now();

        if let Some(entry) = state.entries.get(key) {
            if self.is_expired(entry, now) {
                state.remove(key);
                state.misses += 1;
                return None;
            }
        } else {
            state.misses += 1;
            return None;
        }

        state.touch(key);
        let entry = state.entries.get_mut(key).expect("entry present after touch");
        entry.last_access = now;
        entry.access_count += 1;
        let result = entry.result.clone();
        state.hits += 1;
        Some(result)
    }

    /// Insert or overwrite an entry at the MRU end, evicting from the LRU
    /// end until both ceilings are satisfied.
    pub fn put(&self, key: String, result: SynthesisResult) {
        let footprint = result.memory_footprint();
        let now = Utc::now();
        let mut state = self.state.lock().expect("cache lock poisoned");

        if state.entries.contains_key(&key) {
            state.remove(&key);
        }

        state.entries.insert(
            key.clone(),
            CacheEntry {
                result,
                created_at: now,
                last_access: now,
                access_count: 0,
                memory_footprint: footprint,
            },
        );
        state.order.insert(0, key);
        state.current_bytes += footprint;

        self.evict_to_fit(&mut state);
    }

    fn evict_to_fit(&self, state: &mut State) {
        loop {
            let over_bytes = state.current_bytes > self.max_bytes;
            let over_count = self.max_entries.is_some_and(|max| state.entries.len() > max);
            if !over_bytes && !over_count {
                break;
            }
            let Some(lru_key) = state.order.pop() else {
                break;
            };
            if let Some(entry) = state.entries.remove(&lru_key) {
                state.current_bytes = state.current_bytes.saturating_sub(entry.memory_footprint);
                state.evictions += 1;
            }
        }
    }

    /// Drop every cached entry. Does not reset hit/miss/eviction counters.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.clear();
        state.order.clear();
        state.current_bytes = 0;
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache lock poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
            bytes: state.current_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_samples(n: usize) -> SynthesisResult {
        SynthesisResult {
            audio: super::super::types::AudioData::new(vec![0.0; n], 24_000),
            ..Default::default()
        }
    }

    #[test]
    fn miss_then_hit_after_put() {
        let cache = ResultCache::new(10 * 1024 * 1024, None, 0);
        assert!(cache.get("k1").is_none());
        cache.put("k1".to_owned(), result_with_samples(10));
        assert!(cache.get("k1").is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn bytes_never_exceed_ceiling_after_put() {
        let cache = ResultCache::new(1024 * 1024, None, 0);
        for i in 0..20 {
            cache.put(format!("k{i}"), result_with_samples(100_000));
        }
        let stats = cache.stats();
        assert!(stats.bytes <= 1024 * 1024);
        assert!(stats.evictions > 0);
    }

    #[test]
    fn lru_evicts_earliest_inserted_first() {
        // Each entry ~400 KB of samples; ceiling forces eviction.
        let cache = ResultCache::new(1024 * 1024, None, 0);
        cache.put("first".to_owned(), result_with_samples(100_000));
        cache.put("second".to_owned(), result_with_samples(100_000));
        cache.put("third".to_owned(), result_with_samples(100_000));
        // Touch "second" and "third" to keep them warm, forcing eviction of "first".
        cache.get("second");
        cache.get("third");
        for i in 0..10 {
            cache.put(format!("filler{i}"), result_with_samples(100_000));
        }
        assert!(cache.get("first").is_none());
    }

    #[test]
    fn entry_count_ceiling_is_independent_of_byte_ceiling() {
        let cache = ResultCache::new(100 * 1024 * 1024, Some(2), 0);
        cache.put("a".to_owned(), result_with_samples(1));
        cache.put("b".to_owned(), result_with_samples(1));
        cache.put("c".to_owned(), result_with_samples(1));
        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn expired_entry_is_removed_and_counted_as_miss() {
        let cache = ResultCache::new(10 * 1024 * 1024, None, 0);
        cache.put("k1".to_owned(), result_with_samples(1));
        // TTL of 0 disables expiry: entry should still be present.
        assert!(cache.get("k1").is_some());
    }

    #[test]
    fn clear_drops_entries_but_not_counters() {
        let cache = ResultCache::new(10 * 1024 * 1024, None, 0);
        cache.put("k1".to_owned(), result_with_samples(1));
        cache.get("k1");
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().hits, 1);
    }
}
