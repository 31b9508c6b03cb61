//! Least-recently-used chunk cache.
//!
//! Recency is a strictly increasing access sequence, never a clock, so two
//! entries can never tie and eviction order is fully deterministic.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tileworld_common::ChunkKey;
use tileworld_worldgen::ChunkPayload;

/// A resident chunk.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<ChunkPayload>,
    /// Access sequence number of the latest touch.
    last_access: u64,
    /// Cleanup tick of the latest touch.
    touched_tick: u64,
}

/// A chunk removed from the cache.
pub type Evicted = (ChunkKey, Arc<ChunkPayload>);

/// Chunk payloads keyed by canonical chunk key, ordered by recency.
#[derive(Debug, Default)]
pub struct ChunkCache {
    entries: HashMap<ChunkKey, CacheEntry>,
    /// `last_access -> key`, oldest first.
    order: BTreeMap<u64, ChunkKey>,
    sequence: u64,
    tick: u64,
}

impl ChunkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is resident.
    #[must_use]
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.entries.contains_key(key)
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Returns the payload for `key` and marks it most recently used.
    pub fn touch(&mut self, key: &ChunkKey) -> Option<Arc<ChunkPayload>> {
        let sequence = self.next_sequence();
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.last_access);
        entry.last_access = sequence;
        entry.touched_tick = tick;
        self.order.insert(sequence, key.clone());
        Some(Arc::clone(&entry.payload))
    }

    /// Inserts or replaces `key` as the most recently used entry.
    pub fn insert(&mut self, key: ChunkKey, payload: Arc<ChunkPayload>) {
        let sequence = self.next_sequence();
        let entry = CacheEntry {
            payload,
            last_access: sequence,
            touched_tick: self.tick,
        };
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.order.remove(&old.last_access);
        }
        self.order.insert(sequence, key);
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<Evicted> {
        let (_, key) = self.order.pop_first()?;
        let entry = self.entries.remove(&key)?;
        Some((key, entry.payload))
    }

    /// Evicts least recently used entries until at most `capacity` remain.
    pub fn evict_over(&mut self, capacity: usize) -> Vec<Evicted> {
        let mut evicted = Vec::new();
        while self.entries.len() > capacity {
            match self.pop_lru() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        evicted
    }

    /// Advances the cleanup clock by one tick and evicts entries untouched
    /// for at least `idle_ticks` ticks, oldest first.
    pub fn prune_idle(&mut self, idle_ticks: u32) -> Vec<Evicted> {
        self.tick += 1;
        let now = self.tick;
        let idle: Vec<(u64, ChunkKey)> = self
            .order
            .iter()
            .filter(|(_, key)| {
                self.entries
                    .get(*key)
                    .is_some_and(|e| now - e.touched_tick >= u64::from(idle_ticks))
            })
            .map(|(&seq, key)| (seq, key.clone()))
            .collect();

        idle.into_iter()
            .filter_map(|(seq, key)| {
                self.order.remove(&seq);
                self.entries.remove(&key).map(|e| (key, e.payload))
            })
            .collect()
    }

    /// Keys from least to most recently used.
    #[must_use]
    pub fn keys_lru(&self) -> Vec<ChunkKey> {
        self.order.values().cloned().collect()
    }

    /// Drops every entry, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::OnceLock;
    use tileworld_worldgen::WorldGenerator;

    fn payload() -> Arc<ChunkPayload> {
        static PAYLOAD: OnceLock<Arc<ChunkPayload>> = OnceLock::new();
        Arc::clone(PAYLOAD.get_or_init(|| {
            Arc::new(
                WorldGenerator::new(1)
                    .generate_chunk(0, 0, 8)
                    .expect("generate chunk"),
            )
        }))
    }

    fn key(x: i32) -> ChunkKey {
        ChunkKey::new(x, 0)
    }

    #[test]
    fn test_lru_order() {
        let mut cache = ChunkCache::new();
        cache.insert(key(0), payload());
        cache.insert(key(1), payload());
        cache.insert(key(2), payload());
        assert!(cache.touch(&key(0)).is_some());

        assert_eq!(cache.keys_lru(), vec![key(1), key(2), key(0)]);
        let evicted = cache.evict_over(1);
        let keys: Vec<_> = evicted.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key(1), key(2)]);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(0)));
    }

    #[test]
    fn test_touch_missing() {
        let mut cache = ChunkCache::new();
        assert!(cache.touch(&key(5)).is_none());
        assert!(cache.pop_lru().is_none());
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut cache = ChunkCache::new();
        cache.insert(key(0), payload());
        cache.insert(key(1), payload());
        cache.insert(key(0), payload());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys_lru(), vec![key(1), key(0)]);
    }

    #[test]
    fn test_prune_idle() {
        let mut cache = ChunkCache::new();
        cache.insert(key(0), payload());
        cache.insert(key(1), payload());

        assert!(cache.prune_idle(2).is_empty());
        cache.touch(&key(1));
        let pruned: Vec<_> = cache.prune_idle(2).into_iter().map(|(k, _)| k).collect();
        assert_eq!(pruned, vec![key(0)]);
        assert!(cache.contains(&key(1)));

        let pruned = cache.prune_idle(2);
        assert_eq!(pruned.len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = ChunkCache::new();
        cache.insert(key(0), payload());
        cache.insert(key(1), payload());
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert!(cache.keys_lru().is_empty());
    }

    proptest! {
        #[test]
        fn test_bounded_and_lru(
            capacity in 1usize..6,
            ops in prop::collection::vec((any::<bool>(), 0i32..10), 1..80),
        ) {
            let mut cache = ChunkCache::new();
            // Model: keys from least to most recently used.
            let mut model: Vec<ChunkKey> = Vec::new();

            for (is_touch, x) in ops {
                let k = key(x);
                if is_touch {
                    let hit = cache.touch(&k).is_some();
                    prop_assert_eq!(hit, model.contains(&k));
                    if hit {
                        model.retain(|m| m != &k);
                        model.push(k);
                    }
                } else {
                    cache.insert(k.clone(), payload());
                    model.retain(|m| m != &k);
                    model.push(k);
                    let evicted: Vec<_> = cache.evict_over(capacity).into_iter().map(|(k, _)| k).collect();
                    let excess = model.len().saturating_sub(capacity);
                    let expected: Vec<_> = model.drain(..excess).collect();
                    prop_assert_eq!(evicted, expected);
                }
                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.keys_lru(), model.clone());
            }
        }
    }
}
