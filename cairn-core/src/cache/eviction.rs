//! Lazy eviction of least recently used entries
//!
//! Measuring the byte bound means serializing the whole entry sequence, so the
//! cache never does it on a write. Writes raise `needs_trim`; [`LruCache::trim`]
//! runs the eviction pass only when that flag is set, typically right before a
//! save.

use super::lru::LruCache;
use crate::serialization::{CacheCodec, SerializationResult};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Default item bound: effectively unbounded (`i64::MAX`, which still fits a TOML integer)
pub const DEFAULT_MAX_ITEMS: u64 = i64::MAX as u64;

/// Default byte bound: 1 GiB
pub const DEFAULT_MAX_BYTESIZE: u64 = 1024 * 1024 * 1024;

/// Item-count and serialized-size bounds of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBounds {
    pub max_items: u64,
    pub max_bytesize: u64,
}

impl Default for CacheBounds {
    fn default() -> Self {
        Self { max_items: DEFAULT_MAX_ITEMS, max_bytesize: DEFAULT_MAX_BYTESIZE }
    }
}

impl CacheBounds {
    pub fn new(max_items: u64, max_bytesize: u64) -> Self {
        Self { max_items, max_bytesize }
    }

    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_max_bytesize(mut self, max_bytesize: u64) -> Self {
        self.max_bytesize = max_bytesize;
        self
    }

    /// Both bounds must be positive
    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(Error::InvalidConfig("max_items must be greater than 0".to_string()));
        }
        if self.max_bytesize == 0 {
            return Err(Error::InvalidConfig("max_bytesize must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl<K, V, C> LruCache<K, V, C>
where
    K: Hash + Eq + Clone + fmt::Debug + Serialize,
    V: Serialize,
    C: CacheCodec,
{
    /// Byte length of the entry sequence under this cache's codec.
    ///
    /// O(total payload): every entry is encoded, nothing is kept.
    pub fn serialized_bytesize(&self) -> SerializationResult<u64> {
        self.codec.encoded_len(&self.entries())
    }

    /// Evict least recently used entries until both bounds hold.
    ///
    /// A no-op unless a write happened since the last trim. If a single entry is
    /// larger than `max_bytesize` on its own, the cache ends up empty. Returns
    /// the number of evicted entries.
    pub fn trim(&mut self) -> SerializationResult<usize> {
        if !self.needs_trim {
            log::debug!("skipping trim");
            return Ok(0);
        }

        let mut evicted = 0;

        while self.len() as u64 > self.bounds.max_items {
            if self.evict_lru().is_none() {
                break;
            }
            evicted += 1;
        }

        while !self.is_empty() && self.serialized_bytesize()? > self.bounds.max_bytesize {
            self.evict_lru();
            evicted += 1;
        }

        self.needs_trim = false;
        if evicted > 0 {
            log::warn!("trimmed {} items", evicted);
        }
        Ok(evicted)
    }
}
