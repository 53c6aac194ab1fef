//! Configuration system for Cairn
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** - `CAIRN_MAX_ITEMS`, `CAIRN_MAX_BYTESIZE`,
//!    `CAIRN_FORMAT`, `CAIRN_PERSIST_READ_RECENCY`, `CAIRN_LOG_LEVEL`
//! 2. **Config File** (cairn.toml) - Override defaults
//! 3. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use cairn_core::config::CairnConfig;
//!
//! // Load with full supersedence
//! let config = CairnConfig::load()?;
//!
//! // Or load from specific file
//! let config = CairnConfig::from_file("cairn.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ```toml
//! [cache]
//! max_items = 50000
//! max_bytesize = 104857600
//! format = "bincode"
//! persist_read_recency = true
//!
//! [logging]
//! level = "info"
//! ```

pub mod cache;
pub mod logging;

pub use cache::CacheConfig;
pub use logging::LoggingConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE: &str = "cairn.toml";

/// Complete Cairn configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl CairnConfig {
    /// Load configuration with full supersedence chain
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (cairn.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Start with defaults
        let mut config = Self::default();

        // Load from file if it exists
        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        // Apply environment variables (highest priority)
        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.cache.merge(other.cache);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.cache.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
