//! Memoization tests: typed keys, keyword arguments and persisted results

use cairn_core::{CallArgs, CallKey, Error, PersistentLruCache};
use std::cell::Cell;
use tempfile::TempDir;

#[derive(CallArgs)]
struct EpisodeQuery {
    show: String,
    season: u32,
    episode: u32,
    #[call_args(skip)]
    #[allow(dead_code)]
    attempt: u32,
}

#[derive(CallArgs)]
struct Positional(&'static str, i64);

#[test]
fn test_int_and_float_calls_are_separate() {
    let dir = TempDir::new().unwrap();
    let cache: PersistentLruCache<CallKey, u32> =
        PersistentLruCache::open(dir.path().join("memo.cache")).unwrap();
    let calls = Cell::new(0);

    let mut by_int = cache.memoize("f", |(_n,): (i64,)| {
        calls.set(calls.get() + 1);
        1
    });
    by_int.call((1,)).unwrap();
    by_int.call((1,)).unwrap();

    let mut by_float = cache.memoize("f", |(_n,): (f64,)| {
        calls.set(calls.get() + 1);
        2
    });
    assert_eq!(by_float.call((1.0,)).unwrap(), 2);

    assert_eq!(calls.get(), 2);
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn test_derived_keyword_args_ignore_skipped_fields() {
    let first = EpisodeQuery { show: "tvdb://81189".to_string(), season: 5, episode: 14, attempt: 1 };
    let retry = EpisodeQuery { show: "tvdb://81189".to_string(), season: 5, episode: 14, attempt: 2 };

    let key = CallKey::for_call("episode", &first);
    assert_eq!(key, CallKey::for_call("episode", &retry));
    assert_eq!(key.positional_len(), 0);
    assert_eq!(
        key.kwargs().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["episode", "season", "show"]
    );

    // Same arguments, built by hand in another order
    let manual = CallKey::new("episode").kwarg("show", "tvdb://81189").kwarg("episode", 14u32).kwarg("season", 5u32);
    assert_eq!(key, manual);
}

#[test]
fn test_derived_tuple_struct_is_positional() {
    let key = CallKey::for_call("f", &Positional("x", 3));
    assert_eq!(key, CallKey::for_call("f", &("x", 3i64)));
    assert_ne!(key, CallKey::new("f").kwarg("0", "x").kwarg("1", 3i64));
}

#[test]
fn test_memoized_results_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.cache");
    let calls = Cell::new(0);
    let lookup = |query: EpisodeQuery| {
        calls.set(calls.get() + 1);
        format!("{}/s{:02}e{:02}", query.show, query.season, query.episode)
    };

    for attempt in 0..2 {
        let cache: PersistentLruCache<CallKey, String> = PersistentLruCache::open(&path).unwrap();
        let mut memo = cache.memoize("episode_guid", lookup);
        let guid = memo
            .call(EpisodeQuery { show: "tvdb://81189".to_string(), season: 5, episode: 14, attempt })
            .unwrap();
        assert_eq!(guid, "tvdb://81189/s05e14");
        drop(memo);
        cache.close().unwrap();
    }

    assert_eq!(calls.get(), 1);
}

#[test]
fn test_try_call_retries_after_error() {
    let dir = TempDir::new().unwrap();
    let cache: PersistentLruCache<CallKey, u64> =
        PersistentLruCache::open(dir.path().join("memo.cache")).unwrap();
    let failures_left = Cell::new(1);

    let mut fetch = cache.memoize("fetch", |(id,): (u64,)| {
        if failures_left.get() > 0 {
            failures_left.set(failures_left.get() - 1);
            return Err(Error::Serialization("temporarily unavailable".to_string()));
        }
        Ok(id * 10)
    });

    assert!(fetch.try_call((7,)).is_err());
    assert_eq!(fetch.try_call((7,)).unwrap(), 70);
    drop(fetch);
    assert_eq!(cache.len().unwrap(), 1);
}

#[test]
fn test_memoize_on_in_memory_cache() {
    let mut cache: cairn_core::LruCache<CallKey, usize> = cairn_core::LruCache::new();
    let mut len = cache.memoize("len", |(s,): (String,)| s.len());

    assert_eq!(len.call(("cairn".to_string(),)).unwrap(), 5);
    assert_eq!(len.key_for(&("cairn".to_string(),)).function(), "len");
    drop(len);
    assert_eq!(cache.len(), 1);
}
