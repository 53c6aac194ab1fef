//! Cairn - Core
//!
//! A disk-persisted Least-Recently-Used cache for programs that repeat the same
//! expensive lookups run after run.
//!
//! # Overview
//!
//! A cache is an ordered key→value store bounded by item count and by the
//! serialized size of its contents. It is loaded from a single file when opened
//! and written back when closed, only if something changed. Functions can be
//! memoized on top of it, and a process-wide registry flushes any cache that was
//! never closed before the process exits.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cairn_core::PersistentLruCache;
//!
//! let cache: PersistentLruCache<String, Vec<String>> =
//!     PersistentLruCache::open("./cache/guids.cache")?;
//!
//! let guids = cache.get_or_load("plex://movie/5d776".to_string(), || {
//!     vec!["imdb://tt0111161".to_string(), "tmdb://278".to_string()]
//! })?;
//!
//! cache.close()?;
//! # Ok::<(), cairn_core::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`cache`] - The LRU container and its lazy eviction engine
//! - [`serialization`] - Replaceable codecs (bincode, JSON) used for sizing and storage
//! - [`persistence`] - Open/save/close of a cache bound to one file
//! - [`memo`] - Typed call keys and memoized functions
//! - [`registry`] - Exit-time flushing of caches that were never closed
//! - [`config`] - TOML and environment configuration
//! - [`media`] - The media identifier cache used by sync tooling

pub mod cache;
pub mod config; // Configuration system with TOML support
pub mod media;
pub mod memo;
pub mod persistence;
pub mod registry;
pub mod serialization; // Cache codecs (bincode, serde_json)

// Re-export derive macros from cairn-macros so users only need one crate
#[cfg(feature = "macros")]
pub use cairn_macros::CallArgs;

pub use cache::{CacheBounds, LoadingCache, LruCache, DEFAULT_MAX_BYTESIZE, DEFAULT_MAX_ITEMS};
pub use config::{CacheConfig, CairnConfig};
pub use memo::{ArgValue, CallArgs, CallKey, IntoArg, Memoized};
pub use persistence::{CacheKey, CacheValue, PersistentLruCache};
pub use serialization::{BincodeCodec, CacheCodec, JsonCodec, SerializationFormat};

use std::path::{Path, PathBuf};

/// Main result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cairn caches
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `close()` was called on a cache that is already closed
    #[error("cache is already closed: {0:?}")]
    AlreadyClosed(PathBuf),
    /// The cache was used after it was closed
    #[error("cache is closed: {0:?}")]
    Closed(PathBuf),
    /// The cache file exists but could not be decoded
    #[error("corrupt cache file {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    /// File I/O errors while loading or saving
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Serialization errors while measuring or encoding entries
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Bounds or configuration values that cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// A thread panicked while holding the cache lock
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Open a persisted cache at `path` with default bounds and the bincode codec.
///
/// A missing file is not an error: the cache starts empty. A file that exists but
/// cannot be decoded is reported as [`Error::Corrupt`].
pub fn open<K, V>(path: impl AsRef<Path>) -> Result<PersistentLruCache<K, V>>
where
    K: CacheKey,
    V: CacheValue,
{
    PersistentLruCache::open(path)
}
