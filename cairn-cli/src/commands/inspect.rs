use anyhow::Result;
use cairn_core::config::CacheConfig;
use cairn_core::CacheCodec;
use std::io::Write;
use std::path::Path;

use super::{finish, open_existing};

/// Print item count, serialized size and bounds
pub fn stat(path: &Path, config: &CacheConfig, out: &mut dyn Write) -> Result<()> {
    let cache = open_existing(path, config)?;
    let bounds = cache.bounds()?;
    let format = cache.with_cache(|inner| inner.codec().format())?;

    writeln!(out, "path:         {}", path.display())?;
    writeln!(out, "format:       {}", format)?;
    writeln!(out, "items:        {}", cache.len()?)?;
    writeln!(out, "bytesize:     {}", cache.bytesize()?)?;
    writeln!(out, "max_items:    {}", bounds.max_items)?;
    writeln!(out, "max_bytesize: {}", bounds.max_bytesize)?;

    finish(cache)
}

/// Print keys from least to most recently used
pub fn keys(path: &Path, config: &CacheConfig, limit: Option<usize>, out: &mut dyn Write) -> Result<()> {
    let cache = open_existing(path, config)?;
    let keys = cache.keys()?;
    let skip = limit.map_or(0, |limit| keys.len().saturating_sub(limit));

    for key in &keys[skip..] {
        writeln!(out, "{}", key)?;
    }

    finish(cache)
}

/// Print the identifiers of `key`, one per line
pub fn get(path: &Path, config: &CacheConfig, key: &str, touch: bool, out: &mut dyn Write) -> Result<()> {
    let cache = open_existing(path, config)?;
    let key = key.to_string();
    let guids = if touch { cache.get(&key)? } else { cache.peek(&key)? };

    match guids {
        Some(guids) => {
            for guid in guids {
                writeln!(out, "{}", guid)?;
            }
        }
        None => writeln!(out, "{} is not cached", key)?,
    }

    finish(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, sample_cache};
    use cairn_core::SerializationFormat;

    #[test]
    fn stat_reports_items_and_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let mut buf = Vec::new();

        stat(&path, &CacheConfig::default(), &mut buf).unwrap();

        let text = output(buf);
        assert!(text.contains("format:       bincode"));
        assert!(text.contains("items:        3"));
        assert!(text.contains(&format!("max_bytesize: {}", 1u64 << 30)));
    }

    #[test]
    fn keys_in_recency_order_with_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());

        let mut buf = Vec::new();
        keys(&path, &CacheConfig::default(), None, &mut buf).unwrap();
        assert_eq!(output(buf), "plex://1\nplex://2\nplex://3\n");

        let mut buf = Vec::new();
        keys(&path, &CacheConfig::default(), Some(2), &mut buf).unwrap();
        assert_eq!(output(buf), "plex://2\nplex://3\n");
    }

    #[test]
    fn get_without_touch_leaves_the_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let before = std::fs::read(&path).unwrap();

        let mut buf = Vec::new();
        get(&path, &CacheConfig::default(), "plex://1", false, &mut buf).unwrap();

        assert_eq!(output(buf), "imdb://tt1\ntmdb://1\n");
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn get_with_touch_updates_recency() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());

        get(&path, &CacheConfig::default(), "plex://1", true, &mut Vec::new()).unwrap();

        let mut buf = Vec::new();
        keys(&path, &CacheConfig::default(), None, &mut buf).unwrap();
        assert_eq!(output(buf), "plex://2\nplex://3\nplex://1\n");
    }

    #[test]
    fn get_missing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let mut buf = Vec::new();

        get(&path, &CacheConfig::default(), "plex://9", false, &mut buf).unwrap();
        assert_eq!(output(buf), "plex://9 is not cached\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = stat(&tmp.path().join("absent.cache"), &CacheConfig::default(), &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("no cache file"));
    }

    #[test]
    fn wrong_format_is_reported_as_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sample_cache(tmp.path());
        let config = CacheConfig { format: SerializationFormat::Json, ..CacheConfig::default() };

        let err = stat(&path, &config, &mut Vec::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("corrupt cache file"));
    }
}
