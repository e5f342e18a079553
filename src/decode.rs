// src/decode.rs
//! Decoding replacement files into mip levels.
//!
//! Two paths, picked by the loader:
//! - **Container** (`.dds`): surfaces are copied as stored, block compression kept, and every
//!   embedded mip level comes back in one call
//! - **Raster** (anything `image` understands, `.png` in practice): expanded to RGBA8, one level

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ddsfile::{D3DFormat, Dds, DxgiFormat};

use crate::directories::has_extension;
use crate::error::{HiresError, Result};
use crate::texture::{calculate_mip_count, Level, LevelFormat};

pub const CONTAINER_EXTENSION: &str = "dds";

/// Image codec as seen by the loader.
pub trait TextureDecoder: Send + Sync {
    /// Every level stored in a structured container, largest first.
    fn decode_container(&self, path: &Path) -> Result<Vec<Level>>;

    /// One RGBA8 level from encoded raster bytes. `row_length` equals `width`.
    fn decode_raster(&self, bytes: &[u8]) -> Result<Level>;

    fn decode_raster_file(&self, path: &Path) -> Result<Level> {
        let bytes =
            std::fs::read(path).map_err(|e| HiresError::from(e).context(format!("reading {}", path.display())))?;
        self.decode_raster(&bytes)
    }
}

/// Decoder backed by the `image` and `ddsfile` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    fn level_format(dds: &Dds) -> Result<LevelFormat> {
        if let Some(format) = dds.get_dxgi_format() {
            return match format {
                DxgiFormat::BC1_Typeless | DxgiFormat::BC1_UNorm | DxgiFormat::BC1_UNorm_sRGB => {
                    Ok(LevelFormat::Dxt1)
                }
                DxgiFormat::BC2_Typeless | DxgiFormat::BC2_UNorm | DxgiFormat::BC2_UNorm_sRGB => {
                    Ok(LevelFormat::Dxt3)
                }
                DxgiFormat::BC3_Typeless | DxgiFormat::BC3_UNorm | DxgiFormat::BC3_UNorm_sRGB => {
                    Ok(LevelFormat::Dxt5)
                }
                DxgiFormat::BC7_Typeless | DxgiFormat::BC7_UNorm | DxgiFormat::BC7_UNorm_sRGB => {
                    Ok(LevelFormat::Bptc)
                }
                DxgiFormat::R8G8B8A8_Typeless | DxgiFormat::R8G8B8A8_UNorm | DxgiFormat::R8G8B8A8_UNorm_sRGB => {
                    Ok(LevelFormat::Rgba8)
                }
                DxgiFormat::B8G8R8A8_Typeless | DxgiFormat::B8G8R8A8_UNorm | DxgiFormat::B8G8R8A8_UNorm_sRGB => {
                    Ok(LevelFormat::Bgra8)
                }
                other => Err(HiresError::UnsupportedFormat(format!("{other:?}"))),
            };
        }

        match dds.get_d3d_format() {
            Some(D3DFormat::DXT1) => Ok(LevelFormat::Dxt1),
            Some(D3DFormat::DXT3) => Ok(LevelFormat::Dxt3),
            Some(D3DFormat::DXT5) => Ok(LevelFormat::Dxt5),
            Some(D3DFormat::A8B8G8R8) => Ok(LevelFormat::Rgba8),
            Some(D3DFormat::A8R8G8B8) => Ok(LevelFormat::Bgra8),
            Some(other) => Err(HiresError::UnsupportedFormat(format!("{other:?}"))),
            None => Err(HiresError::UnsupportedFormat("unknown pixel format".to_string())),
        }
    }

    /// Splits the first surface's mip chain out of `dds`.
    ///
    /// Header dimensions are not trusted: the chain is capped at a full mip chain and every
    /// level is checked against the bytes actually present.
    fn split_levels(dds: &Dds, format: LevelFormat) -> Result<Vec<Level>> {
        let mut width = dds.header.width;
        let mut height = dds.header.height;
        if width == 0 || height == 0 {
            return Err(HiresError::EmptyImage);
        }
        let level_count = dds
            .header
            .mip_map_count
            .unwrap_or(1)
            .clamp(1, calculate_mip_count(width, height));
        let mut offset = 0usize;
        let mut levels = Vec::with_capacity(level_count as usize);

        for level in 0..level_count {
            let Some((row_length, size)) = format.surface_layout(width, height) else {
                return Err(HiresError::UnsupportedFormat(format!(
                    "{width}x{height} {format:?} surface is too large"
                )));
            };
            let end = match offset.checked_add(size) {
                Some(end) if end <= dds.data.len() => end,
                _ => {
                    let err = HiresError::Truncated {
                        level,
                        needed: size,
                        available: dds.data.len().saturating_sub(offset),
                    };
                    if levels.is_empty() {
                        return Err(err);
                    }
                    log::warn!("{}, keeping {} level(s)", err, levels.len());
                    break;
                }
            };

            levels.push(Level::new(dds.data[offset..end].to_vec(), width, height, row_length, format));
            offset = end;
            width = (width / 2).max(1);
            height = (height / 2).max(1);
        }

        Ok(levels)
    }
}

impl TextureDecoder for ImageDecoder {
    fn decode_container(&self, path: &Path) -> Result<Vec<Level>> {
        if !has_extension(path, CONTAINER_EXTENSION) {
            return Err(HiresError::NotAContainer(path.display().to_string()));
        }

        let file = File::open(path)?;
        let dds = Dds::read(BufReader::new(file))?;
        let format = Self::level_format(&dds)?;
        Self::split_levels(&dds, format)
    }

    fn decode_raster(&self, bytes: &[u8]) -> Result<Level> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(HiresError::EmptyImage);
        }
        Ok(Level::new(rgba.into_raw(), width, height, width, LevelFormat::Rgba8))
    }
}
