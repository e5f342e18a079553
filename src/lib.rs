// src/lib.rs
//! Replacement ("hires") textures for an emulated GPU.
//!
//! Native texture uploads are named from their content, looked up in a folder of user
//! supplied images, decoded and validated, and handed back as mip chains ready for upload.
//!
//! - `naming`: content-hash names and wildcard lookup
//! - `directories` / `registry`: which files exist for the running game
//! - `loader` / `decode`: files to validated `ReplacementTexture`s
//! - `cache` / `prefetch`: keeping decoded textures in memory
//! - `hires`: the `HiresTextures` facade tying it together

pub mod cache;
pub mod config;
pub mod decode;
pub mod directories;
pub mod error;
pub mod hires;
pub mod loader;
pub mod naming;
pub mod prefetch;
pub mod quirks;
pub mod registry;
pub mod texture;

pub use cache::{CacheStats, TextureCache};
pub use config::{HiresConfig, Settings, SharedSettings};
pub use decode::{ImageDecoder, TextureDecoder};
pub use directories::resolve_directories;
pub use error::{HiresError, Result};
pub use hires::HiresTextures;
pub use loader::Loader;
pub use naming::{NameGenerator, TextureKey, TEXTURE_PREFIX};
pub use prefetch::{prefetch_budget, LogNotifier, MemoryInfo, Notifier, PrefetchOutcome, Prefetcher, SysinfoMemory};
pub use quirks::{NameOverride, NoOverride, ReThreeMaskQuirks};
pub use registry::{DiskRegistry, DiskTexture, RegistryMap};
pub use texture::{calculate_mip_count, Level, LevelFormat, ReplacementTexture, TextureFormat};
