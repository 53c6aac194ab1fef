use anyhow::Result;
use cairn_core::config::CacheConfig;
use std::io::Write;
use std::path::Path;

use super::{finish, open_existing};

/// Remove `key` and save
pub fn delete(path: &Path, config: &CacheConfig, key: &str, out: &mut dyn Write) -> Result<()> {
    let cache = open_existing(path, config)?;

    match cache.delete(&key.to_string())? {
        Some(_) => writeln!(out, "deleted {}", key)?,
        None => writeln!(out, "{} is not cached", key)?,
    }

    finish(cache)
}

/// Remove every key and save
pub fn clear(path: &Path, config: &CacheConfig, out: &mut dyn Write) -> Result<()> {
    let cache = open_existing(path, config)?;
    let count = cache.len()?;
    cache.clear()?;
    writeln!(out, "cleared {} items", count)?;

    finish(cache)
}

/// Apply the configured bounds, or the given overrides, and save
pub fn trim(
    path: &Path,
    config: &CacheConfig,
    max_items: Option<u64>,
    max_bytesize: Option<u64>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(max_items) = max_items {
        config.max_items = max_items;
    }
    if let Some(max_bytesize) = max_bytesize {
        config.max_bytesize = max_bytesize;
    }
    config.validate()?;

    let cache = open_existing(path, &config)?;
    let evicted = cache.trim()?;
    writeln!(out, "evicted {} items, {} left", evicted, cache.len()?)?;

    finish(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::inspect;
    use crate::commands::testing::{output, sample_cache};

    fn keys_of(path: &Path) -> String {
        let mut buf = Vec::new();
        inspect::keys(path, &CacheConfig::default(), None, &mut buf).unwrap();
        output(buf)
    }

    #[test]
    fn delete_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let mut buf = Vec::new();

        delete(&path, &CacheConfig::default(), "plex://2", &mut buf).unwrap();

        assert_eq!(output(buf), "deleted plex://2\n");
        assert_eq!(keys_of(&path), "plex://1\nplex://3\n");
    }

    #[test]
    fn delete_missing_key_keeps_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let before = std::fs::read(&path).unwrap();
        let mut buf = Vec::new();

        delete(&path, &CacheConfig::default(), "plex://9", &mut buf).unwrap();

        assert_eq!(output(buf), "plex://9 is not cached\n");
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn clear_empties_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let mut buf = Vec::new();

        clear(&path, &CacheConfig::default(), &mut buf).unwrap();

        assert_eq!(output(buf), "cleared 3 items\n");
        assert_eq!(keys_of(&path), "");
    }

    #[test]
    fn trim_evicts_least_recently_used() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let mut buf = Vec::new();

        trim(&path, &CacheConfig::default(), Some(1), None, &mut buf).unwrap();

        assert_eq!(output(buf), "evicted 2 items, 1 left\n");
        assert_eq!(keys_of(&path), "plex://3\n");
    }

    #[test]
    fn trim_rejects_zero_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());

        assert!(trim(&path, &CacheConfig::default(), Some(0), None, &mut Vec::new()).is_err());
        assert_eq!(keys_of(&path), "plex://1\nplex://2\nplex://3\n");
    }
}
