pub mod edit;
pub mod inspect;

use anyhow::{bail, Context, Result};
use cairn_core::config::CacheConfig;
use cairn_core::media::{self, GuidCache};
use cairn_core::SerializationFormat;
use std::path::Path;

/// Open an existing cache file. A missing file is an error here: the library
/// would silently start an empty cache.
fn open_existing(path: &Path, config: &CacheConfig) -> Result<GuidCache<SerializationFormat>> {
    if !path.is_file() {
        bail!("no cache file at {}", path.display());
    }
    media::open_guid_cache_configured(path, config)
        .with_context(|| format!("failed to open cache {}", path.display()))
}

/// Close explicitly so a failed save is reported instead of logged on drop
fn finish(cache: GuidCache<SerializationFormat>) -> Result<()> {
    cache.close().with_context(|| format!("failed to save cache {}", cache.path().display()))
}

#[cfg(test)]
pub(crate) mod testing {
    use cairn_core::config::CacheConfig;
    use cairn_core::media::{self, GuidSet};
    use std::path::{Path, PathBuf};

    /// A bincode guid cache with three items, `plex://1` the least recently used
    pub fn sample_cache(dir: &Path) -> PathBuf {
        let path = dir.join("guids.cache");
        let cache = media::open_guid_cache_configured(&path, &CacheConfig::default()).unwrap();
        for (key, guids) in [
            ("plex://1", vec!["imdb://tt1", "tmdb://1"]),
            ("plex://2", vec!["imdb://tt2"]),
            ("plex://3", vec!["tvdb://3"]),
        ] {
            let set: GuidSet = guids.into_iter().map(String::from).collect();
            cache.set(key.to_string(), set).unwrap();
        }
        cache.close().unwrap();
        path
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}
