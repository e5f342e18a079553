// src/texture.rs
//! CPU-side replacement textures.
//! - `TextureFormat`: native texture format codes, part of every generated name
//! - `LevelFormat`: pixel layout of a decoded mip level
//! - `Level` / `ReplacementTexture`: immutable decoded mip chain handed to the renderer

use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Native formats
// ─────────────────────────────────────────────────────────────────────────────

/// Native texture format of the texture being uploaded. The integer code is what
/// ends up in the `_{format}` segment of a generated name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureFormat {
    I4 = 0x0,
    I8 = 0x1,
    IA4 = 0x2,
    IA8 = 0x3,
    RGB565 = 0x4,
    RGB5A3 = 0x5,
    RGBA8 = 0x6,
    C4 = 0x8,
    C8 = 0x9,
    C14X2 = 0xA,
    CMPR = 0xE,
}

impl TextureFormat {
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0x0 => Self::I4,
            0x1 => Self::I8,
            0x2 => Self::IA4,
            0x3 => Self::IA8,
            0x4 => Self::RGB565,
            0x5 => Self::RGB5A3,
            0x6 => Self::RGBA8,
            0x8 => Self::C4,
            0x9 => Self::C8,
            0xA => Self::C14X2,
            0xE => Self::CMPR,
            _ => return None,
        })
    }

    /// Color-indexed formats carry a palette.
    #[inline]
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::C4 | Self::C8 | Self::C14X2)
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoded level formats
// ─────────────────────────────────────────────────────────────────────────────

/// Pixel layout of a decoded level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelFormat {
    Rgba8,
    Bgra8,
    /// BC1
    Dxt1,
    /// BC2
    Dxt3,
    /// BC3
    Dxt5,
    /// BC7
    Bptc,
}

impl LevelFormat {
    #[inline]
    pub fn is_compressed(self) -> bool {
        !matches!(self, Self::Rgba8 | Self::Bgra8)
    }

    /// Bytes per 4x4 block for compressed formats, bytes per pixel otherwise.
    #[inline]
    pub fn block_bytes(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Dxt1 => 8,
            Self::Dxt3 | Self::Dxt5 | Self::Bptc => 16,
        }
    }

    /// Row length (in texels) and byte size of one surface of this format.
    /// Compressed surfaces are padded to whole 4x4 blocks.
    ///
    /// `None` when the size does not fit in `usize`.
    pub fn surface_layout(self, width: u32, height: u32) -> Option<(u32, usize)> {
        if self.is_compressed() {
            let blocks_wide = width.div_ceil(4);
            let blocks_high = height.div_ceil(4);
            let size = (blocks_wide as usize)
                .checked_mul(blocks_high as usize)?
                .checked_mul(self.block_bytes())?;
            Some((blocks_wide.checked_mul(4)?, size))
        } else {
            let size = (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(self.block_bytes())?;
            Some((width, size))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Level
// ─────────────────────────────────────────────────────────────────────────────

/// One decoded mip level.
#[derive(Clone, PartialEq, Eq)]
pub struct Level {
    data: Vec<u8>,
    width: u32,
    height: u32,
    row_length: u32,
    format: LevelFormat,
}

impl Level {
    pub fn new(data: Vec<u8>, width: u32, height: u32, row_length: u32, format: LevelFormat) -> Self {
        Self {
            data,
            width,
            height,
            row_length,
            format,
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Hands the pixel buffer over to the caller.
    #[inline]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn row_length(&self) -> u32 {
        self.row_length
    }

    #[inline]
    pub fn format(&self) -> LevelFormat {
        self.format
    }

    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("row_length", &self.row_length)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replacement texture
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, immutable mip chain. Level 0 is the base level.
#[derive(Debug, Clone)]
pub struct ReplacementTexture {
    levels: Vec<Level>,
    has_arbitrary_mipmaps: bool,
}

impl ReplacementTexture {
    /// Returns `None` for an empty chain.
    pub fn new(levels: Vec<Level>, has_arbitrary_mipmaps: bool) -> Option<Self> {
        if levels.is_empty() {
            return None;
        }
        Some(Self {
            levels,
            has_arbitrary_mipmaps,
        })
    }

    #[inline]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[inline]
    pub fn base_level(&self) -> &Level {
        &self.levels[0]
    }

    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn format(&self) -> LevelFormat {
        self.levels[0].format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    #[inline]
    pub fn has_arbitrary_mipmaps(&self) -> bool {
        self.has_arbitrary_mipmaps
    }

    /// Decoded bytes across all levels.
    pub fn size_bytes(&self) -> usize {
        self.levels.iter().map(Level::size_bytes).sum()
    }

    pub fn into_levels(self) -> Vec<Level> {
        self.levels
    }
}

/// Number of levels in a full chain from `width`x`height` down to 1x1.
pub fn calculate_mip_count(width: u32, height: u32) -> u32 {
    let (mut w, mut h) = (width, height);
    let mut count = 1;
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_covers_full_chain() {
        assert_eq!(calculate_mip_count(1, 1), 1);
        assert_eq!(calculate_mip_count(64, 64), 7);
        assert_eq!(calculate_mip_count(640, 480), 10);
        assert_eq!(calculate_mip_count(8, 1), 4);
    }

    #[test]
    fn format_codes_round_trip_through_name_segment() {
        assert_eq!(TextureFormat::I4.code(), 0);
        assert_eq!(TextureFormat::CMPR.to_string(), "14");
        assert_eq!(TextureFormat::from_code(9), Some(TextureFormat::C8));
        assert_eq!(TextureFormat::from_code(7), None);
        assert!(TextureFormat::C14X2.is_indexed());
        assert!(!TextureFormat::RGBA8.is_indexed());
    }

    #[test]
    fn compressed_layout_pads_to_blocks() {
        assert_eq!(LevelFormat::Dxt1.surface_layout(8, 8), Some((8, 32)));
        assert_eq!(LevelFormat::Dxt1.surface_layout(2, 2), Some((4, 8)));
        assert_eq!(LevelFormat::Bptc.surface_layout(4, 12), Some((4, 48)));
        assert_eq!(LevelFormat::Rgba8.surface_layout(3, 2), Some((3, 24)));
    }

    #[test]
    fn oversized_layout_does_not_overflow() {
        // row length of a block-padded u32::MAX width no longer fits in u32
        assert_eq!(LevelFormat::Dxt5.surface_layout(u32::MAX, u32::MAX), None);
        assert_eq!(LevelFormat::Dxt1.surface_layout(u32::MAX - 3, 4).map(|(row, _)| row), Some(u32::MAX - 3));
        assert_eq!(LevelFormat::Rgba8.surface_layout(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(ReplacementTexture::new(Vec::new(), false).is_none());

        let tex = ReplacementTexture::new(
            vec![
                Level::new(vec![0; 64], 4, 4, 4, LevelFormat::Rgba8),
                Level::new(vec![0; 16], 2, 2, 2, LevelFormat::Rgba8),
            ],
            true,
        )
        .unwrap();
        assert_eq!(tex.size_bytes(), 80);
        assert_eq!(tex.format(), LevelFormat::Rgba8);
        assert_eq!((tex.width(), tex.height()), (4, 4));
        assert!(tex.has_arbitrary_mipmaps());
    }
}
