// src/prefetch.rs
//! Background prefetch of every replacement texture.
//!
//! - Runs on one named thread per registry generation
//! - Stops early on cancel (silently) or when the decoded total crosses the memory budget, in
//!   which case the whole feature is switched off through `Settings`
//! - Shares the cache with `search`, using the same unlocked-load discipline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sysinfo::System;

use crate::cache::TextureCache;
use crate::config::Settings;
use crate::decode::TextureDecoder;
use crate::error::{HiresError, Result};
use crate::loader::Loader;
use crate::naming::mip_level_of;
use crate::registry::RegistryMap;

/// Memory always left to the rest of the system.
pub const RESERVED_MEMORY: u64 = 2 * 1024 * 1024 * 1024;

/// How long prefetch notifications stay on screen.
pub const MESSAGE_DURATION: Duration = Duration::from_secs(10);

const THREAD_NAME: &str = "Prefetcher";

/// The smaller of half of system memory and everything but `RESERVED_MEMORY`.
pub fn prefetch_budget(system_memory: u64) -> u64 {
    (system_memory / 2).min(system_memory.saturating_sub(RESERVED_MEMORY))
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

pub trait MemoryInfo: Send + Sync {
    /// Physical memory in bytes.
    fn total_memory(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoMemory;

impl MemoryInfo for SysinfoMemory {
    fn total_memory(&self) -> u64 {
        let mut system = System::new();
        system.refresh_memory();
        system.total_memory()
    }
}

/// Sink for short user-facing messages.
pub trait Notifier: Send + Sync {
    fn add_message(&self, text: &str, duration: Duration);
}

/// Forwards messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn add_message(&self, text: &str, duration: Duration) {
        log::info!("{} ({}s)", text, duration.as_secs());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prefetch pass
// ─────────────────────────────────────────────────────────────────────────────

/// Everything one prefetch pass reads or writes.
#[derive(Clone)]
pub struct PrefetchContext {
    pub registry: Arc<RegistryMap>,
    pub cache: Arc<TextureCache>,
    pub decoder: Arc<dyn TextureDecoder>,
    pub settings: Arc<dyn Settings>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrefetchOutcome {
    Completed { bytes: u64, elapsed: Duration },
    Cancelled { bytes: u64 },
    BudgetExceeded { bytes: u64 },
}

impl PrefetchOutcome {
    pub fn bytes(&self) -> u64 {
        match *self {
            Self::Completed { bytes, .. } | Self::Cancelled { bytes } | Self::BudgetExceeded { bytes } => bytes,
        }
    }
}

/// Loads every level-0 texture in `ctx.registry` into `ctx.cache`.
///
/// Names are visited in sorted order. `cancel` is checked once per name.
pub fn run_prefetch(ctx: &PrefetchContext, budget: u64, cancel: &AtomicBool) -> PrefetchOutcome {
    let start = Instant::now();
    let loader = Loader::new(&ctx.registry, ctx.decoder.as_ref());

    let mut names: Vec<&String> = ctx
        .registry
        .keys()
        .filter(|name| mip_level_of(name).map_or(true, |level| level == 0))
        .collect();
    names.sort_unstable();

    let mut total = 0u64;
    for name in names {
        let texture = match ctx.cache.peek(name) {
            Some(texture) => Some(texture),
            None => loader.load(name, 0, 0).map(|texture| {
                let texture = Arc::new(texture);
                ctx.cache.insert(name.as_str(), Arc::clone(&texture));
                texture
            }),
        };
        if let Some(texture) = texture {
            total += texture.size_bytes() as u64;
        }

        if cancel.load(Ordering::Acquire) {
            log::debug!("Prefetch cancelled after {:.1} MB", megabytes(total));
            return PrefetchOutcome::Cancelled { bytes: total };
        }

        if total > budget {
            ctx.settings.disable_hires();
            let text = format!(
                "Custom Textures prefetching after {:.1} MB aborted, not enough RAM available",
                megabytes(total)
            );
            log::warn!("{}", text);
            ctx.notifier.add_message(&text, MESSAGE_DURATION);
            return PrefetchOutcome::BudgetExceeded { bytes: total };
        }
    }

    let elapsed = start.elapsed();
    ctx.notifier.add_message(
        &format!(
            "Custom Textures loaded, {:.1} MB in {:.1}s",
            megabytes(total),
            elapsed.as_secs_f64()
        ),
        MESSAGE_DURATION,
    );
    PrefetchOutcome::Completed { bytes: total, elapsed }
}

// ─────────────────────────────────────────────────────────────────────────────
// Background task
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to a running prefetch thread.
pub struct Prefetcher {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<PrefetchOutcome>>,
}

impl Prefetcher {
    pub fn start(ctx: PrefetchContext, budget: u64) -> Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        log::debug!(
            "Prefetching {} custom texture(s), budget {:.1} MB",
            ctx.registry.len(),
            megabytes(budget)
        );
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_prefetch(&ctx, budget, &flag))
            .map_err(|e| HiresError::from(e).context("spawning prefetch thread"))?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Waits for the thread. `None` if it was already joined or panicked.
    pub fn join(&mut self) -> Option<PrefetchOutcome> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                log::error!("Prefetch thread panicked");
                None
            }
        }
    }

    /// Cancels and waits.
    pub fn stop(&mut self) -> Option<PrefetchOutcome> {
        self.request_cancel();
        self.join()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.stop();
    }
}
