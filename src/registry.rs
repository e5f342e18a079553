// src/registry.rs
//! Index of replacement files on disk.
//!
//! - Keys are file stems (`tex1_...`), with one trailing `_arb` stripped and remembered as a flag
//! - Only `.png` and `.dds` files count; everything else in the pack folders is ignored
//! - A reload swaps in a freshly built map, so readers holding a `snapshot()` never see a
//!   half-built index

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use walkdir::WalkDir;

use crate::directories::has_extension;
use crate::error::HiresError;
use crate::naming::TEXTURE_PREFIX;

pub const TEXTURE_EXTENSIONS: [&str; 2] = ["png", "dds"];
pub const ARBITRARY_MIPMAP_SUFFIX: &str = "_arb";

/// One file in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTexture {
    pub path: PathBuf,
    /// The stem carried `_arb`: mip levels are hand-authored rather than downscaled.
    pub has_arbitrary_mipmaps: bool,
}

pub type RegistryMap = HashMap<String, DiskTexture>;

/// Splits the registry key and `_arb` flag out of a file stem.
pub fn registry_key(stem: &str) -> (String, bool) {
    match stem.rfind(ARBITRARY_MIPMAP_SUFFIX) {
        Some(idx) => {
            let mut key = String::with_capacity(stem.len() - ARBITRARY_MIPMAP_SUFFIX.len());
            key.push_str(&stem[..idx]);
            key.push_str(&stem[idx + ARBITRARY_MIPMAP_SUFFIX.len()..]);
            (key, true)
        }
        None => (stem.to_string(), false),
    }
}

fn is_texture_file(path: &Path) -> bool {
    TEXTURE_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

/// Builds a map from every matching file under `directories`.
///
/// Directories are visited in order and files in name order. When two files share a key the
/// first one seen stays and every folder containing a duplicate gets one error line.
pub fn scan_directories<'a>(directories: impl IntoIterator<Item = &'a PathBuf>) -> RegistryMap {
    let mut map = RegistryMap::new();

    for dir in directories {
        let mut conflicts = 0usize;

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let err = HiresError::from(err).context(format!("scanning {}", dir.display()));
                    log::warn!("{}", err);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !is_texture_file(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !stem.starts_with(TEXTURE_PREFIX) {
                continue;
            }

            let (key, has_arbitrary_mipmaps) = registry_key(stem);
            match map.entry(key) {
                Entry::Occupied(existing) => {
                    conflicts += 1;
                    log::debug!(
                        "Ignoring {}, {} already provides {}",
                        path.display(),
                        existing.get().path.display(),
                        existing.key()
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(DiskTexture {
                        path: path.to_path_buf(),
                        has_arbitrary_mipmaps,
                    });
                }
            }
        }

        if conflicts > 0 {
            log::error!(
                "Found {} duplicate custom texture(s) in {}, only the first of each is used",
                conflicts,
                dir.display()
            );
        }
    }

    map
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DiskRegistry {
    entries: RwLock<Arc<RegistryMap>>,
}

impl DiskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current map. Stays valid after later reloads.
    pub fn snapshot(&self) -> Arc<RegistryMap> {
        self.entries.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<DiskTexture> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        *self.entries.write() = Arc::new(RegistryMap::new());
    }

    pub fn replace(&self, map: RegistryMap) {
        *self.entries.write() = Arc::new(map);
    }

    /// Rebuilds from `directories` and returns the number of entries found.
    pub fn reload(&self, directories: &BTreeSet<PathBuf>) -> usize {
        let map = scan_directories(directories);
        let count = map.len();
        log::info!("Found {} custom texture(s) in {} folder(s)", count, directories.len());
        self.replace(map);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn arb_suffix_is_stripped_once_from_the_right() {
        assert_eq!(
            registry_key("tex1_8x8_0000000000000001_0_arb"),
            ("tex1_8x8_0000000000000001_0".to_string(), true)
        );
        assert_eq!(
            registry_key("tex1_8x8_arb_0000000000000001_0_arb_mip1"),
            ("tex1_8x8_arb_0000000000000001_0_mip1".to_string(), true)
        );
        assert_eq!(registry_key("tex1_8x8_1_0"), ("tex1_8x8_1_0".to_string(), false));
    }

    #[test]
    fn scan_keeps_prefixed_png_and_dds_only() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("GLEE08");
        touch(&dir.join("tex1_4x4_0000000000000001_0.png"));
        touch(&dir.join("nested").join("tex1_4x4_0000000000000002_0.DDS"));
        touch(&dir.join("tex1_4x4_0000000000000003_0_arb.png"));
        touch(&dir.join("tex1_4x4_0000000000000004_0.jpg"));
        touch(&dir.join("efb1_4x4_0000000000000005_0.png"));
        touch(&dir.join("readme.txt"));

        let map = scan_directories(&BTreeSet::from([dir.clone()]));
        let mut keys: Vec<_> = map.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "tex1_4x4_0000000000000001_0",
                "tex1_4x4_0000000000000002_0",
                "tex1_4x4_0000000000000003_0",
            ]
        );
        assert!(map["tex1_4x4_0000000000000003_0"].has_arbitrary_mipmaps);
        assert!(!map["tex1_4x4_0000000000000001_0"].has_arbitrary_mipmaps);
        assert_eq!(
            map["tex1_4x4_0000000000000002_0"].path,
            dir.join("nested").join("tex1_4x4_0000000000000002_0.DDS")
        );
    }

    #[test]
    fn first_file_wins_on_conflict() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        touch(&a.join("tex1_4x4_0000000000000001_0.png"));
        touch(&a.join("tex1_4x4_0000000000000001_0.dds"));
        touch(&b.join("tex1_4x4_0000000000000001_0.png"));

        let map = scan_directories(&BTreeSet::from([a.clone(), b]));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map["tex1_4x4_0000000000000001_0"].path,
            a.join("tex1_4x4_0000000000000001_0.dds")
        );
    }

    #[test]
    fn reload_replaces_and_snapshots_survive() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("g");
        touch(&dir.join("tex1_4x4_0000000000000001_0.png"));

        let registry = DiskRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.reload(&BTreeSet::from([dir.clone()])), 1);
        let before = registry.snapshot();

        fs::remove_file(dir.join("tex1_4x4_0000000000000001_0.png")).unwrap();
        touch(&dir.join("tex1_4x4_0000000000000002_0.png"));
        registry.reload(&BTreeSet::from([dir]));

        assert!(before.contains_key("tex1_4x4_0000000000000001_0"));
        assert!(!registry.contains("tex1_4x4_0000000000000001_0"));
        assert!(registry.get("tex1_4x4_0000000000000002_0").is_some());

        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
