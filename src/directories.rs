// src/directories.rs
//! Which folders under the texture root belong to a game.
//!
//! - `<root>/<game_id>`, or failing that `<root>/<first 3 chars of game_id>`
//! - plus the top-level folder of any `<game_id>.txt` / `<region-free id>.txt` marker file,
//!   which lets one pack folder serve several game ids

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::HiresError;

pub const MARKER_EXTENSION: &str = "txt";

/// First three characters of a game id, shared by all regions of a game.
pub fn region_free_id(game_id: &str) -> &str {
    match game_id.char_indices().nth(3) {
        Some((idx, _)) => &game_id[..idx],
        None => game_id,
    }
}

pub fn resolve_directories(root: &Path, game_id: &str) -> BTreeSet<PathBuf> {
    let mut result = BTreeSet::new();
    if game_id.is_empty() {
        return result;
    }
    let region_free = region_free_id(game_id);

    let game_dir = root.join(game_id);
    if game_dir.exists() {
        result.insert(game_dir);
    } else {
        let region_free_dir = root.join(region_free);
        if region_free_dir.exists() {
            result.insert(region_free_dir);
        }
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let err = HiresError::from(err).context(format!("skipping entry under {}", root.display()));
                log::debug!("{}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_extension(entry.path(), MARKER_EXTENSION) {
            continue;
        }
        let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem != game_id && stem != region_free {
            continue;
        }
        if let Some(top) = top_level_dir(root, entry.path()) {
            log::debug!("Marker {} adds {}", entry.path().display(), top.display());
            result.insert(top);
        }
    }

    result
}

/// `<root>/<first component>` for a file nested at least one folder deep under `root`.
fn top_level_dir(root: &Path, file: &Path) -> Option<PathBuf> {
    let relative = file.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    // markers sitting directly in the root do not name a folder
    components.next()?;
    match first {
        Component::Normal(name) => Some(root.join(name)),
        _ => None,
    }
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn region_free_id_takes_three_chars() {
        assert_eq!(region_free_id("GLEE08"), "GLE");
        assert_eq!(region_free_id("GL"), "GL");
    }

    #[test]
    fn exact_game_folder_wins_over_region_free() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("GLEE08")).unwrap();
        fs::create_dir_all(tmp.path().join("GLE")).unwrap();

        let dirs = resolve_directories(tmp.path(), "GLEE08");
        assert_eq!(dirs, BTreeSet::from([tmp.path().join("GLEE08")]));
    }

    #[test]
    fn region_free_folder_is_the_fallback() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("GLE")).unwrap();

        let dirs = resolve_directories(tmp.path(), "GLEP08");
        assert_eq!(dirs, BTreeSet::from([tmp.path().join("GLE")]));
    }

    #[test]
    fn marker_files_add_their_top_level_folder() {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("My Pack").join("gameids");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("GLEE08.txt"), "").unwrap();
        fs::create_dir_all(tmp.path().join("Other").join("ids")).unwrap();
        fs::write(tmp.path().join("Other").join("ids").join("GLE.txt"), "").unwrap();
        fs::create_dir_all(tmp.path().join("Unrelated")).unwrap();
        fs::write(tmp.path().join("Unrelated").join("GZLE01.txt"), "").unwrap();
        // in the root itself: ignored
        fs::write(tmp.path().join("GLEE08.txt"), "").unwrap();

        let dirs = resolve_directories(tmp.path(), "GLEE08");
        assert_eq!(
            dirs,
            BTreeSet::from([tmp.path().join("My Pack"), tmp.path().join("Other")])
        );
    }

    #[test]
    fn missing_root_resolves_to_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(resolve_directories(&tmp.path().join("absent"), "GLEE08").is_empty());
    }
}
