//! Caching module for Cairn
//!
//! Provides the LRU (Least Recently Used) container every other part of the crate
//! builds on, plus the lazy eviction engine that keeps it within its item and
//! byte bounds.

pub mod eviction;
pub mod lru;
pub mod traits;

pub use eviction::{CacheBounds, DEFAULT_MAX_BYTESIZE, DEFAULT_MAX_ITEMS};
pub use lru::{Entries, Iter, LruCache};
pub use traits::LoadingCache;
