// src/naming.rs
//! Content-based texture names.
//!
//! A name looks like `tex1_{w}x{h}[_m]_{texel:016x}[_{palette:016x}]_{format}`:
//! - texel hash: xxHash64 of the raw texel buffer
//! - palette hash: xxHash64 of the palette entries the texels actually reference
//! - format: native format code
//!
//! Stored files may put `$` in place of either hash to match any value.

use std::fmt::Write as _;
use std::sync::Arc;

use xxhash_rust::xxh64::xxh64;

use crate::quirks::{NameOverride, NoOverride};
use crate::registry::RegistryMap;
use crate::texture::TextureFormat;

pub const TEXTURE_PREFIX: &str = "tex1_";
pub const WILDCARD: &str = "$";
pub const MIP_MARKER: &str = "_mip";

/// Palette table sizes in bytes, keyed by index width.
const PALETTE_4BIT: usize = 16 * 2;
const PALETTE_8BIT: usize = 256 * 2;
const PALETTE_14BIT: usize = 16384 * 2;

/// Bytes per palette entry.
const PALETTE_ENTRY: usize = 2;

/// Everything about an upload that goes into its name.
#[derive(Debug, Clone, Copy)]
pub struct TextureKey<'a> {
    pub texels: &'a [u8],
    /// Empty for non-indexed textures.
    pub palette: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub has_mipmaps: bool,
}

impl<'a> TextureKey<'a> {
    pub fn new(texels: &'a [u8], width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            texels,
            palette: &[],
            width,
            height,
            format,
            has_mipmaps: false,
        }
    }

    pub fn with_palette(mut self, palette: &'a [u8]) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_mipmaps(mut self, has_mipmaps: bool) -> Self {
        self.has_mipmaps = has_mipmaps;
        self
    }
}

#[inline]
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

/// Narrows `palette` to the entries between the lowest and highest index used by `texels`.
///
/// Only the three native table sizes are narrowed; any other non-empty palette is returned whole.
/// An indexed texture with no texels references nothing and yields an empty slice.
pub fn used_palette<'p>(texels: &[u8], palette: &'p [u8]) -> &'p [u8] {
    let range = match palette.len() {
        0 => return palette,
        PALETTE_4BIT => index_range(texels.iter().flat_map(|&b| [u32::from(b & 0xf), u32::from(b >> 4)])),
        PALETTE_8BIT => index_range(texels.iter().map(|&b| u32::from(b))),
        // Only the leading byte of each big-endian halfword is read. Existing packs are
        // named with this, so it has to stay.
        PALETTE_14BIT => index_range(
            texels
                .iter()
                .step_by(2)
                .map(|&b| u32::from(u16::from(b).swap_bytes() & 0x3fff)),
        ),
        _ => return palette,
    };

    match range {
        Some((min, max)) => {
            let start = (min as usize * PALETTE_ENTRY).min(palette.len());
            let end = ((max as usize + 1) * PALETTE_ENTRY).min(palette.len());
            &palette[start..end]
        }
        None => &palette[..0],
    }
}

fn index_range(indices: impl Iterator<Item = u32>) -> Option<(u32, u32)> {
    indices.fold(None, |acc, i| match acc {
        None => Some((i, i)),
        Some((min, max)) => Some((min.min(i), max.max(i))),
    })
}

/// Parsed `_mip{n}` suffix of a registry name, if any.
pub fn mip_level_of(name: &str) -> Option<u32> {
    let idx = name.rfind(MIP_MARKER)?;
    let digits = &name[idx + MIP_MARKER.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Name of mip level `level` of `base_name`.
pub fn mip_name(base_name: &str, level: u32) -> String {
    if level == 0 {
        base_name.to_string()
    } else {
        format!("{base_name}{MIP_MARKER}{level}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Name segments
// ─────────────────────────────────────────────────────────────────────────────

/// The separately hashed pieces of a name, each with its leading `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    /// `tex1_{w}x{h}[_m]`
    pub base: String,
    /// `_{texel:016x}`
    pub texel: String,
    /// `_{palette:016x}`, an override token, or empty
    pub palette: String,
    /// `_{format}`
    pub format: String,
}

impl NameParts {
    pub fn full(&self) -> String {
        format!("{}{}{}{}", self.base, self.texel, self.palette, self.format)
    }

    /// Any palette for this exact texel content.
    pub fn palette_wildcard(&self) -> String {
        format!("{}{}_{WILDCARD}{}", self.base, self.texel, self.format)
    }

    /// Any texel content drawn with this palette.
    pub fn texel_wildcard(&self) -> String {
        format!("{}_{WILDCARD}{}{}", self.base, self.palette, self.format)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generator
// ─────────────────────────────────────────────────────────────────────────────

pub struct NameGenerator {
    overrides: Arc<dyn NameOverride>,
}

impl NameGenerator {
    pub fn new(overrides: Arc<dyn NameOverride>) -> Self {
        Self { overrides }
    }

    pub fn reset(&self) {
        self.overrides.reset();
    }

    pub fn parts(&self, key: &TextureKey<'_>) -> NameParts {
        let palette = used_palette(key.texels, key.palette);
        let texel_hash = content_hash(key.texels);
        let palette_hash = (!palette.is_empty()).then(|| content_hash(palette));

        let mut base = String::with_capacity(24);
        let _ = write!(base, "{TEXTURE_PREFIX}{}x{}", key.width, key.height);
        if key.has_mipmaps {
            base.push_str("_m");
        }

        let palette_segment = match self.overrides.palette_override(texel_hash, palette_hash, key.width) {
            Some(token) => format!("_{token}"),
            None => palette_hash.map(|h| format!("_{h:016x}")).unwrap_or_default(),
        };

        NameParts {
            base,
            texel: format!("_{texel_hash:016x}"),
            palette: palette_segment,
            format: format!("_{}", key.format.code()),
        }
    }

    /// Name to look up for `key`.
    ///
    /// Lookups try the palette wildcard, then the texel wildcard, then the exact name, and
    /// return `None` when nothing in `registry` matches. Dump requests skip the registry and
    /// always get the exact name.
    pub fn generate(&self, key: &TextureKey<'_>, registry: &RegistryMap, dump: bool) -> Option<String> {
        if !dump && registry.is_empty() {
            return None;
        }

        let parts = self.parts(key);
        if dump {
            return Some(parts.full());
        }

        [parts.palette_wildcard(), parts.texel_wildcard(), parts.full()]
            .into_iter()
            .find(|name| registry.contains_key(name))
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new(Arc::new(NoOverride))
    }
}
