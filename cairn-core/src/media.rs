//! Media identifier cache
//!
//! Sync tooling resolves a media server item (`plex://movie/5d776...`) to the
//! external identifiers it is known by (`imdb://tt0111161`, `tmdb://278`, ...).
//! Resolving needs a metadata request per item, so results are kept in a
//! persisted cache keyed by the item key. Each resolved identifier is also
//! stored as a key pointing back at its item, so lookups work both ways.

use crate::config::CacheConfig;
use crate::persistence::PersistentLruCache;
use crate::serialization::{BincodeCodec, CacheCodec, SerializationFormat};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// External identifiers of one media item, ordered for stable storage
pub type GuidSet = BTreeSet<String>;

/// Cache from item keys to identifiers (and identifiers back to item keys)
pub type GuidCache<C = BincodeCodec> = PersistentLruCache<String, GuidSet, C>;

pub fn open_guid_cache(path: impl AsRef<Path>) -> Result<GuidCache> {
    PersistentLruCache::open(path)
}

pub fn open_guid_cache_configured(
    path: impl AsRef<Path>,
    config: &CacheConfig,
) -> Result<GuidCache<SerializationFormat>> {
    PersistentLruCache::open_configured(path, config)
}

/// Identifiers of `item_key`, calling `fetch` only when they are not cached.
///
/// An empty result is not cached, so items the metadata source knows nothing
/// about yet are fetched again next time. Freshly fetched identifiers are
/// also recorded as aliases of `item_key` (see [`item_for_guid`]). Errors
/// from `fetch` are returned unchanged and nothing is cached for the item.
pub fn item_guids<C, E, F>(cache: &GuidCache<C>, item_key: &str, fetch: F) -> std::result::Result<GuidSet, E>
where
    C: CacheCodec + Send + 'static,
    F: FnOnce() -> std::result::Result<GuidSet, E>,
    E: From<Error>,
{
    let key = item_key.to_string();
    if let Some(guids) = cache.get(&key)? {
        if !guids.is_empty() {
            return Ok(guids);
        }
    }

    let guids = fetch()?;
    if !guids.is_empty() {
        cache.set(key, guids.clone())?;
        for guid in &guids {
            cache.set(guid.clone(), GuidSet::from([item_key.to_string()]))?;
        }
    }
    Ok(guids)
}

/// The item key an identifier was resolved from, if it has been seen
pub fn item_for_guid<C>(cache: &GuidCache<C>, guid: &str) -> Result<Option<String>>
where
    C: CacheCodec + Send + 'static,
{
    Ok(cache.peek(&guid.to_string())?.and_then(|items| items.into_iter().next()))
}

/// Episode code as used in episode identifiers: `s01e02`
pub fn season_episode(season: u32, episode: u32) -> String {
    format!("s{:02}e{:02}", season, episode)
}

/// Episode identifiers derived from the show's identifiers: `"{guid}/{s01e02}"`
pub fn episode_guids(show_guids: &GuidSet, season_episode: &str) -> GuidSet {
    show_guids.iter().map(|guid| format!("{}/{}", guid, season_episode)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guids(ids: &[&str]) -> GuidSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_season_episode() {
        assert_eq!(season_episode(1, 2), "s01e02");
        assert_eq!(season_episode(12, 104), "s12e104");
    }

    #[test]
    fn test_episode_guids() {
        let show = guids(&["imdb://tt0903747", "tvdb://81189"]);
        assert_eq!(
            episode_guids(&show, &season_episode(5, 14)),
            guids(&["imdb://tt0903747/s05e14", "tvdb://81189/s05e14"])
        );
        assert!(episode_guids(&GuidSet::new(), "s01e01").is_empty());
    }

    #[test]
    fn test_item_guids_fetches_once_and_records_aliases() {
        let dir = TempDir::new().unwrap();
        let cache = open_guid_cache(dir.path().join("guids.cache")).unwrap();
        let mut fetches = 0;

        for _ in 0..2 {
            let found = item_guids(&cache, "plex://movie/5d776", || {
                fetches += 1;
                Ok::<_, Error>(guids(&["imdb://tt0111161", "tmdb://278"]))
            })
            .unwrap();
            assert_eq!(found, guids(&["imdb://tt0111161", "tmdb://278"]));
        }

        assert_eq!(fetches, 1);
        assert_eq!(item_for_guid(&cache, "tmdb://278").unwrap().as_deref(), Some("plex://movie/5d776"));
        assert_eq!(item_for_guid(&cache, "tmdb://1").unwrap(), None);
    }

    #[test]
    fn test_item_guids_fetch_error_caches_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = open_guid_cache(dir.path().join("guids.cache")).unwrap();

        let result = item_guids(&cache, "plex://show/1", || {
            Err::<GuidSet, _>(Error::Serialization("metadata unavailable".to_string()))
        });

        assert!(result.is_err());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_item_guids_empty_result_is_fetched_again() {
        let dir = TempDir::new().unwrap();
        let cache = open_guid_cache(dir.path().join("guids.cache")).unwrap();
        let mut fetches = 0;

        let found = item_guids(&cache, "plex://episode/9", || {
            fetches += 1;
            Ok::<_, Error>(GuidSet::new())
        })
        .unwrap();
        assert!(found.is_empty());
        assert!(!cache.contains_key(&"plex://episode/9".to_string()).unwrap());

        let found = item_guids(&cache, "plex://episode/9", || {
            fetches += 1;
            Ok::<_, Error>(guids(&["tvdb://4711"]))
        })
        .unwrap();
        assert_eq!(found, guids(&["tvdb://4711"]));
        assert_eq!(fetches, 2);
        assert_eq!(cache.len().unwrap(), 2);
    }
}
