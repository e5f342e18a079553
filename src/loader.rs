// src/loader.rs
//! Loads and validates one replacement texture.
//!
//! Level 0 is tried as a container first so compressed DDS chains come back in one read. Any
//! level not covered by that is looked up as `<base>_mip<n>` and decoded on its own, container
//! path first, raster path second. The chain stops at the first missing or undecodable level.
//!
//! Validation:
//! - aspect ratio or non-integer scale against the native size: warning only
//! - level `n` not half of level `n - 1` (floored at 1), or a second 1x1 level: chain truncated
//! - formats differing between kept levels: load fails

use crate::decode::TextureDecoder;
use crate::naming::mip_name;
use crate::registry::RegistryMap;
use crate::texture::{Level, ReplacementTexture};

pub struct Loader<'a> {
    registry: &'a RegistryMap,
    decoder: &'a dyn TextureDecoder,
}

impl<'a> Loader<'a> {
    pub fn new(registry: &'a RegistryMap, decoder: &'a dyn TextureDecoder) -> Self {
        Self { registry, decoder }
    }

    /// Loads `base_name` for a native texture of `native_width`x`native_height`.
    ///
    /// Pass zero native dimensions to skip the scale check (prefetching does this).
    pub fn load(&self, base_name: &str, native_width: u32, native_height: u32) -> Option<ReplacementTexture> {
        let base = self.registry.get(base_name)?;

        let mut levels = match self.decoder.decode_container(&base.path) {
            Ok(levels) => levels,
            Err(err) => {
                log::trace!("{} is not a usable container: {}", base.path.display(), err);
                Vec::new()
            }
        };

        for index in levels.len() as u32.. {
            let name = mip_name(base_name, index);
            let Some(entry) = self.registry.get(&name) else {
                break;
            };

            match self.load_level(&entry.path) {
                Some(level) => levels.push(level),
                None => {
                    log::error!("Custom texture {} failed to load", name);
                    break;
                }
            }
        }

        let first = levels.first()?;
        let (width, height) = (first.width(), first.height());
        let path = base.path.display();

        if u64::from(width) * u64::from(native_height) != u64::from(height) * u64::from(native_width) {
            log::error!(
                "Invalid custom texture size {}x{} for texture {}. The aspect differs from the native size {}x{}.",
                width,
                height,
                path,
                native_width,
                native_height
            );
        }

        if native_width != 0 && native_height != 0 && (width % native_width != 0 || height % native_height != 0) {
            log::error!(
                "Invalid custom texture size {}x{} for texture {}. Please use an integer upscaling factor based on the native size {}x{}.",
                width,
                height,
                path,
                native_width,
                native_height
            );
        }

        if let Some(keep) = valid_chain_len(&levels) {
            let level = &levels[keep];
            if is_one_by_one(&levels[keep - 1]) {
                log::error!("Custom texture {} has too many 1x1 mipmaps. Skipping extra levels.", path);
            } else {
                let (ew, eh) = expected_size(&levels[0], keep);
                log::error!(
                    "Invalid custom texture size {}x{} for texture {}. Mipmap level {} must be {}x{}.",
                    level.width(),
                    level.height(),
                    path,
                    keep,
                    ew,
                    eh
                );
            }
            levels.truncate(keep);
        }

        let format = levels[0].format();
        if levels.iter().any(|l| l.format() != format) {
            log::error!("Custom texture {} has inconsistent formats across mip levels.", path);
            return None;
        }

        ReplacementTexture::new(levels, base.has_arbitrary_mipmaps)
    }

    fn load_level(&self, path: &std::path::Path) -> Option<Level> {
        if let Ok(mut levels) = self.decoder.decode_container(path) {
            if !levels.is_empty() {
                return Some(levels.swap_remove(0));
            }
        }
        match self.decoder.decode_raster_file(path) {
            Ok(level) => Some(level),
            Err(err) => {
                log::debug!("{}: {}", path.display(), err);
                None
            }
        }
    }
}

fn is_one_by_one(level: &Level) -> bool {
    level.width() == 1 && level.height() == 1
}

/// Size level `index` must have when halving down from `base`.
fn expected_size(base: &Level, index: usize) -> (u32, u32) {
    let (mut w, mut h) = (base.width(), base.height());
    for _ in 0..index {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    (w, h)
}

/// Index of the first level breaking the halving rule, if any.
fn valid_chain_len(levels: &[Level]) -> Option<usize> {
    let (mut w, mut h) = (levels.first()?.width(), levels.first()?.height());
    for (index, level) in levels.iter().enumerate().skip(1) {
        if w == 1 && h == 1 {
            return Some(index);
        }
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        if level.width() != w || level.height() != h {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HiresError, Result};
    use crate::registry::DiskTexture;
    use crate::texture::LevelFormat;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Serves canned levels by file name.
    #[derive(Default)]
    struct FakeDecoder {
        containers: HashMap<PathBuf, Vec<Level>>,
        rasters: HashMap<PathBuf, Level>,
    }

    impl FakeDecoder {
        fn container(mut self, path: &str, levels: Vec<Level>) -> Self {
            self.containers.insert(PathBuf::from(path), levels);
            self
        }

        fn raster(mut self, path: &str, level: Level) -> Self {
            self.rasters.insert(PathBuf::from(path), level);
            self
        }
    }

    impl TextureDecoder for FakeDecoder {
        fn decode_container(&self, path: &Path) -> Result<Vec<Level>> {
            self.containers
                .get(path)
                .cloned()
                .ok_or_else(|| HiresError::NotAContainer(path.display().to_string()))
        }

        fn decode_raster(&self, _bytes: &[u8]) -> Result<Level> {
            Err(HiresError::EmptyImage)
        }

        fn decode_raster_file(&self, path: &Path) -> Result<Level> {
            self.rasters.get(path).cloned().ok_or(HiresError::EmptyImage)
        }
    }

    fn rgba(w: u32, h: u32) -> Level {
        Level::new(vec![0; (w * h * 4) as usize], w, h, w, LevelFormat::Rgba8)
    }

    fn dxt1(w: u32, h: u32) -> Level {
        let (row, size) = LevelFormat::Dxt1.surface_layout(w, h).unwrap();
        Level::new(vec![0; size], w, h, row, LevelFormat::Dxt1)
    }

    fn registry(entries: &[(&str, &str, bool)]) -> RegistryMap {
        entries
            .iter()
            .map(|&(name, path, arb)| {
                (
                    name.to_string(),
                    DiskTexture {
                        path: PathBuf::from(path),
                        has_arbitrary_mipmaps: arb,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn missing_base_is_none() {
        let reg = registry(&[("b_mip1", "b_mip1.png", false)]);
        let dec = FakeDecoder::default().raster("b_mip1.png", rgba(1, 1));
        assert!(Loader::new(&reg, &dec).load("b", 2, 2).is_none());
    }

    #[test]
    fn single_raster_level() {
        let reg = registry(&[("b", "b.png", true)]);
        let dec = FakeDecoder::default().raster("b.png", rgba(128, 128));
        let tex = Loader::new(&reg, &dec).load("b", 64, 64).unwrap();
        assert_eq!(tex.level_count(), 1);
        assert_eq!((tex.width(), tex.height()), (128, 128));
        assert!(tex.has_arbitrary_mipmaps());
    }

    #[test]
    fn raster_mip_chain_is_walked_in_order() {
        let reg = registry(&[
            ("b", "b.png", false),
            ("b_mip1", "b_mip1.png", false),
            ("b_mip2", "b_mip2.png", false),
            ("b_mip4", "b_mip4.png", false),
        ]);
        let dec = FakeDecoder::default()
            .raster("b.png", rgba(8, 4))
            .raster("b_mip1.png", rgba(4, 2))
            .raster("b_mip2.png", rgba(2, 1))
            .raster("b_mip4.png", rgba(1, 1));
        let tex = Loader::new(&reg, &dec).load("b", 8, 4).unwrap();
        // stops at the missing _mip3
        assert_eq!(tex.level_count(), 3);
    }

    #[test]
    fn container_levels_are_not_reloaded() {
        let reg = registry(&[("b", "b.dds", false), ("b_mip1", "b_mip1.png", false), ("b_mip2", "b_mip2.dds", false)]);
        let dec = FakeDecoder::default()
            .container("b.dds", vec![dxt1(8, 8), dxt1(4, 4)])
            .raster("b_mip1.png", rgba(4, 4))
            .container("b_mip2.dds", vec![dxt1(2, 2), dxt1(1, 1)]);
        let tex = Loader::new(&reg, &dec).load("b", 4, 4).unwrap();
        assert_eq!(tex.level_count(), 3);
        assert_eq!(tex.format(), LevelFormat::Dxt1);
        assert_eq!(tex.levels()[2].width(), 2);
    }

    #[test]
    fn wrong_level_one_size_truncates() {
        let reg = registry(&[("b", "b.png", false), ("b_mip1", "b_mip1.png", false)]);
        let dec = FakeDecoder::default()
            .raster("b.png", rgba(64, 64))
            .raster("b_mip1.png", rgba(16, 16));
        let tex = Loader::new(&reg, &dec).load("b", 64, 64).unwrap();
        assert_eq!(tex.level_count(), 1);
    }

    #[test]
    fn second_one_by_one_level_is_dropped() {
        let reg = registry(&[
            ("b", "b.png", false),
            ("b_mip1", "b_mip1.png", false),
            ("b_mip2", "b_mip2.png", false),
        ]);
        let dec = FakeDecoder::default()
            .raster("b.png", rgba(2, 2))
            .raster("b_mip1.png", rgba(1, 1))
            .raster("b_mip2.png", rgba(1, 1));
        let tex = Loader::new(&reg, &dec).load("b", 2, 2).unwrap();
        assert_eq!(tex.level_count(), 2);
    }

    #[test]
    fn mixed_formats_fail_the_load() {
        let reg = registry(&[("b", "b.dds", false), ("b_mip1", "b_mip1.png", false)]);
        let dec = FakeDecoder::default()
            .container("b.dds", vec![dxt1(8, 8)])
            .raster("b_mip1.png", rgba(4, 4));
        assert!(Loader::new(&reg, &dec).load("b", 8, 8).is_none());
    }

    #[test]
    fn undecodable_level_keeps_earlier_levels() {
        let reg = registry(&[
            ("b", "b.png", false),
            ("b_mip1", "b_mip1.png", false),
            ("b_mip2", "b_mip2.png", false),
        ]);
        let dec = FakeDecoder::default()
            .raster("b.png", rgba(4, 4))
            .raster("b_mip2.png", rgba(1, 1));
        let tex = Loader::new(&reg, &dec).load("b", 4, 4).unwrap();
        assert_eq!(tex.level_count(), 1);

        let broken_base = FakeDecoder::default().raster("b_mip1.png", rgba(2, 2));
        assert!(Loader::new(&reg, &broken_base).load("b", 4, 4).is_none());
    }

    #[test]
    fn geometry_mismatch_is_only_a_warning() {
        let reg = registry(&[("b", "b.png", false)]);
        let dec = FakeDecoder::default().raster("b.png", rgba(100, 30));
        assert!(Loader::new(&reg, &dec).load("b", 64, 64).is_some());
        assert!(Loader::new(&reg, &dec).load("b", 0, 0).is_some());
    }

    #[test]
    fn chain_validation_helpers() {
        assert_eq!(valid_chain_len(&[rgba(8, 2), rgba(4, 1), rgba(2, 1), rgba(1, 1)]), None);
        assert_eq!(valid_chain_len(&[rgba(8, 2), rgba(4, 2)]), Some(1));
        assert_eq!(expected_size(&rgba(8, 2), 3), (1, 1));
    }
}
