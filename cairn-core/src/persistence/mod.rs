//! Caches persisted to a single file
//!
//! [`PersistentLruCache`] binds an [`LruCache`] to a file path:
//!
//! - **open**: a missing file starts an empty cache; a file that cannot be
//!   decoded is an [`Error::Corrupt`], never silently discarded
//! - **save**: only when dirty; trims to the bounds first, then replaces the file
//!   atomically (see [`file`])
//! - **close**: saves and rejects any later use, including a second close
//!
//! Dropping an open handle closes it. Handles are also tracked by the
//! [`registry`](crate::registry), which closes anything still open at process
//! exit.
//!
//! Only one handle may have a given path open at a time; nothing locks the file.

pub mod file;

use crate::cache::{CacheBounds, LoadingCache, LruCache};
use crate::config::CacheConfig;
use crate::memo::Memoized;
use crate::registry::{self, Flushable};
use crate::serialization::{BincodeCodec, CacheCodec, SerializationFormat};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Keys a persisted cache can hold
pub trait CacheKey:
    Hash + Eq + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + 'static
{
}

impl<T> CacheKey for T where
    T: Hash + Eq + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + 'static
{
}

/// Values a persisted cache can hold
pub trait CacheValue: Serialize + DeserializeOwned + Send + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Send + 'static {}

/// A cache and the file it is persisted to
struct Store<K, V, C> {
    cache: LruCache<K, V, C>,
    path: PathBuf,
    closed: bool,
}

impl<K, V, C> Store<K, V, C>
where
    K: CacheKey,
    V: CacheValue,
    C: CacheCodec,
{
    fn load(&mut self) -> Result<()> {
        let payload = match file::read_payload(&self.path)? {
            Some(payload) => payload,
            None => {
                log::debug!("no cache file at {:?}, starting empty", self.path);
                return Ok(());
            }
        };

        let entries: Vec<(K, V)> = self.cache.codec().decode(&payload).map_err(|e| {
            Error::Corrupt { path: self.path.clone(), reason: e.to_string() }
        })?;
        self.cache.load_entries(entries);

        log::info!(
            "loaded cache: {:?} ({} items, {} bytes)",
            self.path,
            self.cache.len(),
            payload.len()
        );
        Ok(())
    }

    fn save(&mut self) -> Result<bool> {
        if !self.cache.is_dirty() {
            log::info!("cache unchanged, not saving: {:?}", self.path);
            return Ok(false);
        }

        self.cache.trim()?;
        let payload = self.cache.codec().encode_to_vec(&self.cache.entries())?;
        log::info!(
            "saving cache: {:?} ({} items, {} bytes)",
            self.path,
            self.cache.len(),
            payload.len()
        );
        file::write_atomic(&self.path, &payload)?;
        self.cache.mark_clean();
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyClosed(self.path.clone()));
        }
        self.save()?;
        self.closed = true;
        log::debug!("closed cache: {:?}", self.path);
        Ok(())
    }
}

impl<K, V, C> Flushable for Store<K, V, C>
where
    K: CacheKey,
    V: CacheValue,
    C: CacheCodec + Send,
{
    fn location(&self) -> &Path {
        &self.path
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn flush_and_close(&mut self) -> Result<()> {
        self.close()
    }
}

/// An LRU cache persisted to one file.
///
/// All operations take `&self`; the state sits behind a mutex so handles can be
/// shared and so the exit hook can reach it. Every operation on a closed handle
/// fails with [`Error::Closed`].
///
/// ```rust,ignore
/// let cache: PersistentLruCache<String, u64> = PersistentLruCache::open("./cache/sizes.cache")?;
/// let size = cache.get_or_load("movie-278".to_string(), || measure("movie-278"))?;
/// cache.close()?;
/// ```
pub struct PersistentLruCache<K, V, C = BincodeCodec> {
    id: u64,
    path: PathBuf,
    store: Arc<Mutex<Store<K, V, C>>>,
    /// Same allocation as `store`, untyped, for `Drop`
    flusher: Arc<Mutex<dyn Flushable>>,
}

impl<K, V> PersistentLruCache<K, V, BincodeCodec>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Open with default bounds and the bincode codec
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, CacheBounds::default(), BincodeCodec)
    }

    /// Open `path`, run `f`, then close, whatever `f` returned.
    ///
    /// See [`scope`](Self::scope).
    pub fn scoped<R, E, F>(path: impl AsRef<Path>, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Self) -> std::result::Result<R, E>,
        E: From<Error>,
    {
        Self::open(path)?.scope(f)
    }
}

impl<K, V> PersistentLruCache<K, V, SerializationFormat>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Open with bounds, format and read-recency policy taken from configuration
    pub fn open_configured(path: impl AsRef<Path>, config: &CacheConfig) -> Result<Self> {
        let bounds = config.bounds();
        bounds.validate()?;
        let cache = LruCache::with_codec(bounds, config.format)
            .with_read_recency(config.persist_read_recency);
        Self::from_cache(path.as_ref(), cache)
    }
}

impl<K, V, C> PersistentLruCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue,
    C: CacheCodec + Send + 'static,
{
    /// Open with explicit bounds and codec.
    ///
    /// The codec must match the one the file was written with; a mismatch
    /// surfaces as [`Error::Corrupt`].
    pub fn open_with(path: impl AsRef<Path>, bounds: CacheBounds, codec: C) -> Result<Self> {
        bounds.validate()?;
        Self::from_cache(path.as_ref(), LruCache::with_codec(bounds, codec))
    }

    fn from_cache(path: &Path, cache: LruCache<K, V, C>) -> Result<Self> {
        let mut store = Store { cache, path: path.to_path_buf(), closed: false };
        store.load()?;

        let store = Arc::new(Mutex::new(store));
        let flusher: Arc<Mutex<dyn Flushable>> = store.clone();
        let id = registry::register(&flusher);

        Ok(Self { id, path: path.to_path_buf(), store, flusher })
    }

    /// Lock an open cache
    fn open_store(&self) -> Result<MutexGuard<'_, Store<K, V, C>>> {
        let store = self.store.lock().map_err(|_| Error::Poisoned)?;
        if store.closed {
            return Err(Error::Closed(self.path.clone()));
        }
        Ok(store)
    }

    /// Get a value, marking it most recently used
    pub fn get(&self, key: &K) -> Result<Option<V>>
    where
        V: Clone,
    {
        Ok(self.open_store()?.cache.get(key).cloned())
    }

    /// Get a value without touching recency or the dirty flag
    pub fn peek(&self, key: &K) -> Result<Option<V>>
    where
        V: Clone,
    {
        Ok(self.open_store()?.cache.peek(key).cloned())
    }

    /// Insert or overwrite, returning the previous value
    pub fn set(&self, key: K, value: V) -> Result<Option<V>> {
        Ok(self.open_store()?.cache.set(key, value))
    }

    /// Remove a key; absent keys are a no-op
    pub fn delete(&self, key: &K) -> Result<Option<V>> {
        Ok(self.open_store()?.cache.delete(key))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.open_store()?.cache.contains_key(key))
    }

    /// Return the value for `key`, computing and storing it on a miss
    pub fn get_or_load<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        self.try_get_or_load(key, || Ok::<V, Error>(compute()))
    }

    /// Fallible [`get_or_load`](Self::get_or_load).
    ///
    /// The lock is released while `compute` runs, so `compute` may use this
    /// cache. If it stores the same key, the computed value overwrites it. An
    /// error from `compute` is returned unchanged and nothing is stored.
    pub fn try_get_or_load<E, F>(&self, key: K, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
        E: From<Error>,
        V: Clone,
    {
        {
            let mut store = self.open_store()?;
            if let Some(value) = store.cache.get(&key) {
                return Ok(value.clone());
            }
        }

        let value = compute()?;
        self.open_store()?.cache.set(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.open_store()?.cache.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.open_store()?.cache.is_empty())
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Result<Vec<K>> {
        Ok(self.open_store()?.cache.keys().cloned().collect())
    }

    pub fn clear(&self) -> Result<()> {
        self.open_store()?.cache.clear();
        Ok(())
    }

    /// Apply the bounds now instead of at the next save
    pub fn trim(&self) -> Result<usize> {
        Ok(self.open_store()?.cache.trim()?)
    }

    /// Serialized size of the current contents
    pub fn bytesize(&self) -> Result<u64> {
        Ok(self.open_store()?.cache.serialized_bytesize()?)
    }

    pub fn bounds(&self) -> Result<CacheBounds> {
        Ok(self.open_store()?.cache.bounds())
    }

    /// Write the cache to its file if it changed since the last save.
    ///
    /// Returns whether a write happened.
    pub fn save(&self) -> Result<bool> {
        self.open_store()?.save()
    }

    /// Save and close. Closing twice is an [`Error::AlreadyClosed`].
    pub fn close(&self) -> Result<()> {
        self.store.lock().map_err(|_| Error::Poisoned)?.close()
    }

    pub fn is_closed(&self) -> bool {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.open_store()?.cache.is_dirty())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with exclusive access to the underlying container.
    ///
    /// The lock is held while `f` runs, so `f` must not call back into this
    /// handle (or a memoized function stored in it); doing so deadlocks.
    pub fn with_cache<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LruCache<K, V, C>) -> R,
    {
        Ok(f(&mut self.open_store()?.cache))
    }

    /// Memoize `func` with this cache as its store
    pub fn memoize<F>(&self, name: impl Into<String>, func: F) -> Memoized<&Self, F> {
        Memoized::new(self, name, func)
    }

    /// Run `f`, then close the cache on every exit path.
    ///
    /// `f`'s error wins over a close error; the close error is then logged.
    pub fn scope<R, E, F>(self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Self) -> std::result::Result<R, E>,
        E: From<Error>,
    {
        let result = f(&self);
        let closed = if self.is_closed() { Ok(()) } else { self.close() };

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                log::error!("failed to close cache {:?}: {}", self.path, close_err);
                Err(e)
            }
        }
    }
}

impl<K, V, C> LoadingCache<K, V> for &PersistentLruCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Clone,
    C: CacheCodec + Send + 'static,
{
    fn load_with<E, F>(&mut self, key: K, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
        E: From<Error>,
    {
        (**self).try_get_or_load(key, compute)
    }
}

impl<K, V, C> fmt::Debug for PersistentLruCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentLruCache").field("path", &self.path).field("id", &self.id).finish()
    }
}

impl<K, V, C> Drop for PersistentLruCache<K, V, C> {
    fn drop(&mut self) {
        registry::deregister(self.id);

        let mut state = self.flusher.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_closed() {
            return;
        }
        if let Err(e) = state.flush_and_close() {
            log::error!("failed to close cache {:?} on drop: {}", self.path, e);
        }
    }
}
