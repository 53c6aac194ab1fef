//! Cache configuration

use crate::cache::{CacheBounds, DEFAULT_MAX_BYTESIZE, DEFAULT_MAX_ITEMS};
use crate::serialization::SerializationFormat;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_items: u64,
    pub max_bytesize: u64,
    pub format: SerializationFormat,
    /// Whether a cache hit alone makes the cache dirty (recency survives reloads)
    pub persist_read_recency: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_bytesize: DEFAULT_MAX_BYTESIZE,
            format: SerializationFormat::default(),
            persist_read_recency: true,
        }
    }
}

impl CacheConfig {
    pub fn bounds(&self) -> CacheBounds {
        CacheBounds::new(self.max_items, self.max_bytesize)
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(items) = lookup("CAIRN_MAX_ITEMS") {
            match items.parse() {
                Ok(n) => self.max_items = n,
                Err(_) => log::warn!("ignoring invalid CAIRN_MAX_ITEMS: {}", items),
            }
        }
        if let Some(size) = lookup("CAIRN_MAX_BYTESIZE") {
            match size.parse() {
                Ok(n) => self.max_bytesize = n,
                Err(_) => log::warn!("ignoring invalid CAIRN_MAX_BYTESIZE: {}", size),
            }
        }
        if let Some(format) = lookup("CAIRN_FORMAT") {
            match format.parse() {
                Ok(f) => self.format = f,
                Err(e) => log::warn!("ignoring CAIRN_FORMAT: {}", e),
            }
        }
        if let Some(persist) = lookup("CAIRN_PERSIST_READ_RECENCY") {
            match persist.parse() {
                Ok(b) => self.persist_read_recency = b,
                Err(_) => log::warn!("ignoring invalid CAIRN_PERSIST_READ_RECENCY: {}", persist),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            bail!("Invalid cache.max_items: must be greater than 0");
        }
        if self.max_bytesize == 0 {
            bail!("Invalid cache.max_bytesize: must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_items, i64::MAX as u64);
        assert_eq!(config.max_bytesize, 1 << 30);
        assert_eq!(config.format, SerializationFormat::Bincode);
        assert!(config.persist_read_recency);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CacheConfig::default();
        config.apply_overrides(overrides(&[
            ("CAIRN_MAX_ITEMS", "500"),
            ("CAIRN_MAX_BYTESIZE", "65536"),
            ("CAIRN_FORMAT", "JSON"),
            ("CAIRN_PERSIST_READ_RECENCY", "false"),
        ]));

        assert_eq!(config.bounds(), CacheBounds::new(500, 65536));
        assert_eq!(config.format, SerializationFormat::Json);
        assert!(!config.persist_read_recency);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = CacheConfig::default();
        config.apply_overrides(overrides(&[("CAIRN_MAX_ITEMS", "lots"), ("CAIRN_FORMAT", "yaml")]));
        assert_eq!(config, CacheConfig::default());

        // A bad value keeps what the config file said
        let mut config = CacheConfig { persist_read_recency: false, ..CacheConfig::default() };
        config.apply_overrides(overrides(&[("CAIRN_PERSIST_READ_RECENCY", "no")]));
        assert!(!config.persist_read_recency);
    }

    #[test]
    fn test_zero_bounds_are_invalid() {
        let config = CacheConfig { max_items: 0, ..CacheConfig::default() };
        assert!(config.validate().is_err());
        let config = CacheConfig { max_bytesize: 0, ..CacheConfig::default() };
        assert!(config.validate().is_err());
    }
}
