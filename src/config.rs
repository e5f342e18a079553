// src/config.rs
//! Configuration for replacement textures.
//!
//! `HiresConfig` is the serializable form (JSON on disk). At runtime the core only sees the
//! narrow `Settings` interface, so the prefetcher can switch the feature off without reaching
//! into whatever config storage the host application uses.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{HiresError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiresConfig {
    /// Replace native textures at all.
    pub enabled: bool,
    /// Prefetch every texture up front and keep the cache across reloads.
    pub cache_enabled: bool,
    /// Root directory holding one folder per game.
    pub root: PathBuf,
    /// Game identifier used to pick texture folders.
    pub game_id: String,
    /// Fixed prefetch budget in bytes instead of the one derived from system memory.
    pub memory_budget: Option<u64>,
}

impl Default for HiresConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_enabled: false,
            root: PathBuf::from("Load/Textures"),
            game_id: String::new(),
            memory_budget: None,
        }
    }
}

impl HiresConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HiresError::from(e).context(format!("reading {}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    pub fn with_cache(mut self, cache_enabled: bool) -> Self {
        self.cache_enabled = cache_enabled;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime settings
// ─────────────────────────────────────────────────────────────────────────────

/// Config storage as seen by the core.
pub trait Settings: Send + Sync {
    fn hires_enabled(&self) -> bool;
    fn cache_enabled(&self) -> bool;
    /// Turns replacement textures off globally. Stays off until the host re-enables it.
    fn disable_hires(&self);
}

/// Lock-free `Settings` backed by two flags.
#[derive(Debug)]
pub struct SharedSettings {
    enabled: AtomicBool,
    cache_enabled: AtomicBool,
}

impl SharedSettings {
    pub fn new(enabled: bool, cache_enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            cache_enabled: AtomicBool::new(cache_enabled),
        }
    }

    pub fn from_config(config: &HiresConfig) -> Self {
        Self::new(config.enabled, config.cache_enabled)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Release);
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::from_config(&HiresConfig::default())
    }
}

impl Settings for SharedSettings {
    fn hires_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }

    fn disable_hires(&self) {
        self.enabled.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = HiresConfig::from_json_str(r#"{ "game_id": "GLEE08", "cache_enabled": true }"#).unwrap();
        assert_eq!(cfg.game_id, "GLEE08");
        assert!(cfg.cache_enabled);
        assert!(cfg.enabled);
        assert_eq!(cfg.root, PathBuf::from("Load/Textures"));
        assert_eq!(cfg.memory_budget, None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(HiresConfig::from_json_str("{ enabled: yes").is_err());
    }

    #[test]
    fn disable_flips_only_the_feature_flag() {
        let settings = SharedSettings::new(true, true);
        settings.disable_hires();
        assert!(!settings.hires_enabled());
        assert!(settings.cache_enabled());
        settings.set_enabled(true);
        assert!(settings.hires_enabled());
    }
}
