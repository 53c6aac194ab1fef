//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A level name or an `env_logger` filter string such as `cairn_core=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("CAIRN_LOG_LEVEL") {
            self.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            bail!("Invalid logging.level: cannot be empty");
        }
        // Plain level names are checked, filter strings are left to env_logger
        let level = self.level.to_ascii_lowercase();
        if !level.contains(['=', ',']) && !LEVELS.contains(&level.as_str()) {
            bail!("Invalid logging.level: {}", self.level);
        }
        Ok(())
    }
}
