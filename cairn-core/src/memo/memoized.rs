//! Memoized functions

use super::key::{CallArgs, CallKey};
use crate::cache::LoadingCache;
use crate::{Error, Result};

/// A function whose results are stored in a cache, keyed by [`CallKey`].
///
/// `S` is any [`LoadingCache`]: `&mut LruCache` for in-memory memoization or
/// `&PersistentLruCache` for results that survive the process.
pub struct Memoized<S, F> {
    store: S,
    name: String,
    func: F,
}

impl<S, F> Memoized<S, F> {
    /// Wrap `func` under a name that identifies it in the cache.
    ///
    /// Use a name that is unique across everything memoized into the same
    /// cache, such as the function's module path.
    pub fn new(store: S, name: impl Into<String>, func: F) -> Self {
        Self { store, name: name.into(), func }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key a call with `args` is stored under
    pub fn key_for<A: CallArgs + ?Sized>(&self, args: &A) -> CallKey {
        CallKey::for_call(self.name.as_str(), args)
    }

    /// Return the cached result for `args`, calling the function on a miss
    pub fn call<A, R>(&mut self, args: A) -> Result<R>
    where
        A: CallArgs,
        F: FnMut(A) -> R,
        S: LoadingCache<CallKey, R>,
    {
        let key = self.key_for(&args);
        let func = &mut self.func;
        self.store.load_with(key, || Ok::<R, Error>(func(args)))
    }

    /// Like [`call`](Self::call) for fallible functions. Errors are returned
    /// unchanged and never cached, so the next call retries.
    pub fn try_call<A, R, E>(&mut self, args: A) -> std::result::Result<R, E>
    where
        A: CallArgs,
        F: FnMut(A) -> std::result::Result<R, E>,
        E: From<Error>,
        S: LoadingCache<CallKey, R>,
    {
        let key = self.key_for(&args);
        let func = &mut self.func;
        self.store.load_with(key, || func(args))
    }

    pub fn into_inner(self) -> (S, F) {
        (self.store, self.func)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::LruCache;
    use crate::memo::{ArgValue, CallKey};

    #[test]
    fn test_memoized_on_lru_cache() {
        let mut cache: LruCache<CallKey, u64> = LruCache::new();
        let mut calls = 0;
        {
            let mut square = cache.memoize("square", |(n,): (u64,)| {
                calls += 1;
                n * n
            });
            assert_eq!(square.call((4,)).unwrap(), 16);
            assert_eq!(square.call((4,)).unwrap(), 16);
            assert_eq!(square.call((5,)).unwrap(), 25);
        }
        assert_eq!(calls, 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&CallKey::new("square").arg(4u64)));
    }

    #[test]
    fn test_key_for_uses_the_name() {
        let mut cache: LruCache<CallKey, u64> = LruCache::new();
        let memo = cache.memoize("lookup", |(_a, _b): (&str, i32)| 0u64);
        let key = memo.key_for(&("x", 1));
        assert_eq!(key.function(), "lookup");
        assert_eq!(
            key.args().cloned().collect::<Vec<_>>(),
            vec![ArgValue::Str("x".to_string()), ArgValue::I32(1)]
        );
    }

    #[test]
    fn test_try_call_does_not_cache_errors() {
        let mut cache: LruCache<CallKey, String> = LruCache::new();
        let mut attempts = 0;
        let mut fetch = cache.memoize("fetch", |(id,): (u32,)| {
            attempts += 1;
            if attempts == 1 {
                Err(crate::Error::Serialization(format!("flaky {}", id)))
            } else {
                Ok(format!("item-{}", id))
            }
        });

        assert!(fetch.try_call((1,)).is_err());
        assert_eq!(fetch.try_call((1,)).unwrap(), "item-1");
        assert_eq!(fetch.try_call((1,)).unwrap(), "item-1");
        drop(fetch);
        assert_eq!(attempts, 2);
    }
}
