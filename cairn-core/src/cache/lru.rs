//! LRU (Least Recently Used) cache container
//!
//! Entries live in an arena-backed doubly-linked list ordered from least recently
//! used (head) to most recently used (tail), with a HashMap for O(1) lookups.
//! Reads that hit and all writes move the key to the tail.
//!
//! Bounds are not checked on every write: a write only raises `needs_trim`, and
//! [`LruCache::trim`] (see the `eviction` module) does the work when asked.

use super::eviction::CacheBounds;
use crate::memo::Memoized;
use crate::serialization::BincodeCodec;
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;

/// Node in the LRU linked list
struct LruNode<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache with lazy item and byte bounds
pub struct LruCache<K, V, C = BincodeCodec> {
    map: HashMap<K, usize>,
    nodes: Vec<Option<LruNode<K, V>>>,
    /// Least recently used
    head: Option<usize>,
    /// Most recently used
    tail: Option<usize>,
    free_list: Vec<usize>,
    pub(super) bounds: CacheBounds,
    pub(super) codec: C,
    /// Mutated since the last save
    dirty: bool,
    /// A write may have pushed the cache past a bound since the last trim
    pub(super) needs_trim: bool,
    /// Whether a hit alone marks the cache dirty
    persist_read_recency: bool,
}

impl<K, V> LruCache<K, V, BincodeCodec>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    /// Create an unbounded-by-count cache with the default 1 GiB byte bound
    pub fn new() -> Self {
        Self::with_codec(CacheBounds::default(), BincodeCodec)
    }

    pub fn with_bounds(bounds: CacheBounds) -> Self {
        Self::with_codec(bounds, BincodeCodec)
    }
}

impl<K, V> Default for LruCache<K, V, BincodeCodec>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> LruCache<K, V, C>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    /// Create a cache measured and stored with `codec`
    pub fn with_codec(bounds: CacheBounds, codec: C) -> Self {
        Self {
            map: HashMap::new(),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
            bounds,
            codec,
            dirty: false,
            needs_trim: false,
            persist_read_recency: true,
        }
    }

    /// Choose whether a cache hit marks the cache dirty.
    ///
    /// Enabled by default so recency order survives a save/reload cycle. When
    /// disabled, hits still reorder entries but a read-only run never forces a
    /// rewrite of the cache file.
    pub fn with_read_recency(mut self, persist: bool) -> Self {
        self.persist_read_recency = persist;
        self
    }

    pub fn bounds(&self) -> CacheBounds {
        self.bounds
    }

    /// Replace the bounds; they are applied at the next trim
    pub fn set_bounds(&mut self, bounds: CacheBounds) {
        self.bounds = bounds;
        self.needs_trim = true;
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Get a value, marking the key most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = match self.map.get(key) {
            Some(&idx) => idx,
            None => {
                log::debug!("miss key={:?}", key);
                return None;
            }
        };
        log::debug!("hit key={:?}", key);
        self.touch(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Get a value without touching recency or the dirty flag
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        log::debug!("set key={:?}", key);
        self.dirty = true;
        self.needs_trim = true;

        if let Some(&idx) = self.map.get(&key) {
            let old = self.nodes[idx].as_mut().map(|node| std::mem::replace(&mut node.value, value));
            self.move_to_back(idx);
            return old;
        }

        self.insert_new(key, value);
        None
    }

    /// Remove a key. Absent keys are a no-op and leave the cache clean.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        log::debug!("del key={:?}", key);
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.free_list.push(idx);
        self.dirty = true;
        Some(node.value)
    }

    /// Return the value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once, synchronously.
    pub fn get_or_load<F>(&mut self, key: K, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        match self.try_get_or_load(key, || Ok::<V, Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible [`get_or_load`](Self::get_or_load): an error from `compute` is
    /// returned unchanged and nothing is stored for `key`.
    pub fn try_get_or_load<E, F>(&mut self, key: K, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let idx = match self.map.get(&key) {
            Some(&idx) => {
                log::debug!("hit key={:?}", key);
                self.touch(idx);
                idx
            }
            None => {
                log::debug!("miss key={:?}", key);
                let value = compute()?;
                self.dirty = true;
                self.needs_trim = true;
                self.insert_new(key, value)
            }
        };

        match &self.nodes[idx] {
            Some(node) => Ok(&node.value),
            None => unreachable!("mapped index {} has no node", idx),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove every entry. Nothing is left to trim.
    pub fn clear(&mut self) {
        log::debug!("clear");
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        self.dirty = true;
        self.needs_trim = false;
    }

    /// Iterate from least to most recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { nodes: &self.nodes, next: self.head, remaining: self.map.len() }
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// The entry sequence in storage order, for codecs
    pub fn entries(&self) -> Entries<'_, K, V, C> {
        Entries { cache: self }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn needs_trim(&self) -> bool {
        self.needs_trim
    }

    /// Memoize `func` with this cache as its store
    pub fn memoize<F>(&mut self, name: impl Into<String>, func: F) -> Memoized<&mut Self, F> {
        Memoized::new(self, name, func)
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Append loaded entries (oldest first) without marking the cache dirty
    pub(crate) fn load_entries(&mut self, entries: Vec<(K, V)>) {
        for (key, value) in entries {
            match self.map.get(&key) {
                Some(&idx) => {
                    if let Some(node) = self.nodes[idx].as_mut() {
                        node.value = value;
                    }
                    self.move_to_back(idx);
                }
                None => {
                    self.insert_new(key, value);
                }
            }
        }
        // Loaded contents may predate tighter bounds
        self.needs_trim = !self.is_empty();
    }

    /// Remove the least recently used entry
    pub(crate) fn evict_lru(&mut self) -> Option<(K, V)> {
        let idx = self.head?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        self.free_list.push(idx);
        self.dirty = true;
        Some((node.key, node.value))
    }

    fn touch(&mut self, idx: usize) {
        self.move_to_back(idx);
        if self.persist_read_recency {
            self.dirty = true;
        }
    }

    fn insert_new(&mut self, key: K, value: V) -> usize {
        let node = LruNode { key: key.clone(), value, prev: None, next: None };
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.push_back(idx);
        self.map.insert(key, idx);
        idx
    }

    /// Detach a node from the list, leaving it in the arena
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = None;
        }
    }

    /// Attach a detached node at the most recently used end
    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = old_tail;
            node.next = None;
        }

        match old_tail {
            Some(tail_idx) => {
                if let Some(tail_node) = &mut self.nodes[tail_idx] {
                    tail_node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }

        self.tail = Some(idx);
    }

    fn move_to_back(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return; // Already most recent
        }
        self.unlink(idx);
        self.push_back(idx);
    }
}

impl<K, V, C> fmt::Debug for LruCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.map.len())
            .field("bounds", &self.bounds)
            .field("dirty", &self.dirty)
            .field("needs_trim", &self.needs_trim)
            .finish()
    }
}

/// Iterator over entries from least to most recently used
pub struct Iter<'a, K, V> {
    nodes: &'a [Option<LruNode<K, V>>],
    next: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.nodes[idx].as_ref()?;
        self.next = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// The entry sequence of a cache, serialized as `(key, value)` pairs from least
/// to most recently used
pub struct Entries<'a, K, V, C> {
    cache: &'a LruCache<K, V, C>,
}

impl<K, V, C> Serialize for Entries<'_, K, V, C>
where
    K: Serialize + Hash + Eq + Clone + fmt::Debug,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Exact size hint: length-prefixed formats need it up front
        serializer.collect_seq(self.cache.iter())
    }
}
