// src/hires.rs
//! `HiresTextures`: the replacement texture subsystem as one owned object.
//!
//! Lifecycle:
//! - `init` once at startup
//! - `update` whenever the game or the settings change (rescans, restarts prefetching)
//! - `search` from any number of render threads
//! - `shutdown` (or drop) to stop the background task and release everything

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheStats, TextureCache};
use crate::config::{HiresConfig, Settings, SharedSettings};
use crate::decode::{ImageDecoder, TextureDecoder};
use crate::directories::resolve_directories;
use crate::loader::Loader;
use crate::naming::{NameGenerator, TextureKey};
use crate::prefetch::{
    prefetch_budget, LogNotifier, MemoryInfo, Notifier, PrefetchContext, PrefetchOutcome, Prefetcher, SysinfoMemory,
};
use crate::quirks::NameOverride;
use crate::registry::{DiskRegistry, RegistryMap};
use crate::texture::ReplacementTexture;

pub struct HiresTextures {
    settings: Arc<dyn Settings>,
    decoder: Arc<dyn TextureDecoder>,
    memory: Arc<dyn MemoryInfo>,
    notifier: Arc<dyn Notifier>,
    names: NameGenerator,
    registry: DiskRegistry,
    cache: Arc<TextureCache>,
    prefetcher: Mutex<Option<Prefetcher>>,
    last_prefetch: Mutex<Option<PrefetchOutcome>>,
    budget_override: Option<u64>,
}

impl HiresTextures {
    pub fn new(
        settings: Arc<dyn Settings>,
        decoder: Arc<dyn TextureDecoder>,
        memory: Arc<dyn MemoryInfo>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            decoder,
            memory,
            notifier,
            names: NameGenerator::default(),
            registry: DiskRegistry::new(),
            cache: Arc::new(TextureCache::new()),
            prefetcher: Mutex::new(None),
            last_prefetch: Mutex::new(None),
            budget_override: None,
        }
    }

    /// Real decoder, system memory query and log notifications.
    pub fn with_settings(settings: Arc<dyn Settings>) -> Self {
        Self::new(
            settings,
            Arc::new(ImageDecoder::new()),
            Arc::new(SysinfoMemory),
            Arc::new(LogNotifier),
        )
    }

    /// Builds from a config file's contents. Returns the settings handle too, so the host can
    /// flip flags later.
    pub fn from_config(config: &HiresConfig) -> (Self, Arc<SharedSettings>) {
        let settings = Arc::new(SharedSettings::from_config(config));
        let mut hires = Self::with_settings(settings.clone());
        hires.budget_override = config.memory_budget;
        (hires, settings)
    }

    pub fn with_name_override(mut self, overrides: Arc<dyn NameOverride>) -> Self {
        self.names = NameGenerator::new(overrides);
        self
    }

    /// Fixed prefetch budget in bytes instead of one derived from system memory.
    pub fn with_budget_override(mut self, budget: u64) -> Self {
        self.budget_override = Some(budget);
        self
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    pub fn init(&self) {
        self.names.reset();
    }

    /// Stops prefetching and drops the registry and cache.
    pub fn shutdown(&self) {
        self.stop_prefetcher();
        self.clear();
    }

    /// Drops the registry and cache. Leaves any running prefetch alone.
    pub fn clear(&self) {
        self.registry.clear();
        self.cache.clear();
    }

    /// Rescans `root` for `game_id` and restarts prefetching when caching is on.
    pub fn update(&self, root: &Path, game_id: &str) {
        self.stop_prefetcher();

        if !self.settings.hires_enabled() {
            self.clear();
            return;
        }

        if !self.settings.cache_enabled() {
            self.cache.clear();
        }

        let directories = resolve_directories(root, game_id);
        self.registry.reload(&directories);

        if self.settings.cache_enabled() {
            let registry = self.registry.snapshot();
            let pruned = self.cache.retain_names(|name| registry.contains_key(name));
            if pruned > 0 {
                log::info!("Dropped {} cached texture(s) no longer on disk", pruned);
            }
            self.start_prefetcher(registry);
        }
    }

    fn start_prefetcher(&self, registry: Arc<RegistryMap>) {
        let budget = self
            .budget_override
            .unwrap_or_else(|| prefetch_budget(self.memory.total_memory()));
        let ctx = PrefetchContext {
            registry,
            cache: Arc::clone(&self.cache),
            decoder: Arc::clone(&self.decoder),
            settings: Arc::clone(&self.settings),
            notifier: Arc::clone(&self.notifier),
        };
        match Prefetcher::start(ctx, budget) {
            Ok(prefetcher) => *self.prefetcher.lock() = Some(prefetcher),
            Err(err) => log::error!("Custom texture prefetching unavailable: {}", err),
        }
    }

    fn stop_prefetcher(&self) {
        let running = self.prefetcher.lock().take();
        if let Some(mut prefetcher) = running {
            let outcome = prefetcher.stop();
            self.record_outcome(outcome);
        }
    }

    fn record_outcome(&self, outcome: Option<PrefetchOutcome>) {
        if let Some(outcome) = outcome {
            log::debug!("Prefetch pass ended: {:?}", outcome);
            *self.last_prefetch.lock() = Some(outcome);
        }
    }

    /// Blocks until the current prefetch pass (if any) finishes.
    pub fn wait_for_prefetch(&self) -> Option<PrefetchOutcome> {
        let mut prefetcher = self.prefetcher.lock().take()?;
        let outcome = prefetcher.join();
        self.record_outcome(outcome);
        outcome
    }

    /// How the most recently joined prefetch pass ended, including ones stopped by a reload.
    pub fn last_prefetch_outcome(&self) -> Option<PrefetchOutcome> {
        *self.last_prefetch.lock()
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Registry name for `key`, or the exact name when `dump` is set.
    pub fn generate_name(&self, key: &TextureKey<'_>, dump: bool) -> Option<String> {
        self.names.generate(key, &self.registry.snapshot(), dump)
    }

    /// Replacement for a native texture, if one exists and loads cleanly.
    ///
    /// Always `None` while the feature is off, including after a prefetch overran its budget.
    pub fn search(&self, key: &TextureKey<'_>) -> Option<Arc<ReplacementTexture>> {
        if !self.settings.hires_enabled() {
            return None;
        }
        let registry = self.registry.snapshot();
        let name = self.names.generate(key, &registry, false)?;

        if let Some(texture) = self.cache.get(&name) {
            return Some(texture);
        }

        let texture = Arc::new(Loader::new(&registry, self.decoder.as_ref()).load(&name, key.width, key.height)?);
        if self.settings.cache_enabled() {
            self.cache.insert(name, Arc::clone(&texture));
        }
        Some(texture)
    }

    /// Loads `base_name` straight from disk, bypassing the cache.
    pub fn load(&self, base_name: &str, native_width: u32, native_height: u32) -> Option<ReplacementTexture> {
        if !self.settings.hires_enabled() {
            return None;
        }
        let registry = self.registry.snapshot();
        Loader::new(&registry, self.decoder.as_ref()).load(base_name, native_width, native_height)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Names currently in the registry, unordered.
    pub fn registry_names(&self) -> Vec<String> {
        self.registry.snapshot().keys().cloned().collect()
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }
}

impl Drop for HiresTextures {
    fn drop(&mut self) {
        self.stop_prefetcher();
    }
}
