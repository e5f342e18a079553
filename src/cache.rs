// src/cache.rs
//! Decoded textures keyed by generated name.
//!
//! - Values are shared `Arc`s: a texture handed to the renderer stays alive even if the entry
//!   is pruned or replaced afterwards
//! - Loading never happens under the lock. Two callers missing on the same name may both load
//!   it; whichever inserts last wins
//! - Hit/miss/insert counters are relaxed atomics and only feed `CacheStats`

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::texture::ReplacementTexture;

#[derive(Debug, Default)]
pub struct TextureCache {
    entries: RwLock<HashMap<String, Arc<ReplacementTexture>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `name`, counting the hit or miss.
    pub fn get(&self, name: &str) -> Option<Arc<ReplacementTexture>> {
        let found = self.entries.read().get(name).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Looks up `name` without touching the counters.
    pub fn peek(&self, name: &str) -> Option<Arc<ReplacementTexture>> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Stores `texture` under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<String>, texture: Arc<ReplacementTexture>) {
        self.entries.write().insert(name.into(), texture);
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops every entry whose name fails `keep`. Returns how many were dropped.
    pub fn retain_names(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|name, _| keep(name));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total decoded bytes held by the cache.
    pub fn resident_bytes(&self) -> u64 {
        self.entries.read().values().map(|t| t.size_bytes() as u64).sum()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            resident_bytes: entries.values().map(|t| t.size_bytes() as u64).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub entry_count: u64,
    pub resident_bytes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, inserts: {}, entries: {}, memory: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.inserts,
            self.entry_count,
            format_bytes(self.resident_bytes)
        )
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
