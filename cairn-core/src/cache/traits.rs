//! Core traits for caching functionality

use super::lru::LruCache;
use crate::Error;
use std::fmt;
use std::hash::Hash;

/// A cache that returns the value for a key, computing and storing it on a miss.
///
/// This is the seam memoization is built on: [`crate::memo::Memoized`] only needs
/// somewhere to get-or-compute results. Implemented by `&mut LruCache` and by
/// `&PersistentLruCache`.
pub trait LoadingCache<K, V> {
    /// Return the cached value for `key`, or store and return `compute()`.
    ///
    /// An error from `compute` is returned unchanged and nothing is stored.
    fn load_with<E, F>(&mut self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: From<Error>;
}

impl<T, K, V> LoadingCache<K, V> for &mut T
where
    T: LoadingCache<K, V> + ?Sized,
{
    fn load_with<E, F>(&mut self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: From<Error>,
    {
        (**self).load_with(key, compute)
    }
}

impl<K, V, C> LoadingCache<K, V> for LruCache<K, V, C>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
{
    fn load_with<E, F>(&mut self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: From<Error>,
    {
        self.try_get_or_load(key, compute).cloned()
    }
}
