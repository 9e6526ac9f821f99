use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-directory folder holding `<entry>.png` thumbnails.
pub const RES_DIR_NAME: &str = ".res";
const THUMB_EXTENSION: &str = ".png";

/// Answers "is there a thumbnail for this list entry, and where".
pub trait ThumbnailResolver {
    fn thumb_path(&mut self, entry_path: &Path) -> Option<PathBuf>;

    fn has_thumbnail(&mut self, entry_path: &Path) -> bool {
        self.thumb_path(entry_path).is_some()
    }
}

/// Lazily populated index of `.res` thumbnail folders.
///
/// The thumbnail for `/Roms/GB/Tetris.gb` is `/Roms/GB/.res/Tetris.gb.png`.
/// Each parent directory is scanned the first time one of its entries is
/// looked up; every later lookup in that directory is a set probe. Entries
/// of a collection may come from many directories, each cached on its own.
/// Directories without thumbnails are remembered too.
///
/// Only used from the render thread; the loader is handed resolved paths.
#[derive(Debug, Default)]
pub struct ResCache {
    dirs: HashMap<PathBuf, Option<HashSet<OsString>>>,
}

impl ResCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets a directory so its `.res` folder is rescanned on next use.
    pub fn invalidate_dir(&mut self, dir: &Path) {
        if self.dirs.remove(dir).is_some() {
            debug!(dir = %dir.display(), "res cache: invalidated");
        }
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    fn thumbnails_in(&mut self, dir: &Path) -> Option<&HashSet<OsString>> {
        self.dirs
            .entry(dir.to_path_buf())
            .or_insert_with(|| scan_res_dir(&dir.join(RES_DIR_NAME)))
            .as_ref()
    }
}

impl ThumbnailResolver for ResCache {
    fn thumb_path(&mut self, entry_path: &Path) -> Option<PathBuf> {
        let (dir, name) = split_entry_path(entry_path)?;
        let file_name = thumb_file_name(name);
        if !self.thumbnails_in(dir)?.contains(&file_name) {
            return None;
        }
        Some(dir.join(RES_DIR_NAME).join(file_name))
    }
}

fn split_entry_path(entry_path: &Path) -> Option<(&Path, &OsStr)> {
    if entry_path.to_string_lossy().ends_with('/') {
        return None;
    }
    let dir = entry_path.parent()?;
    if dir.as_os_str().is_empty() {
        return None;
    }
    Some((dir, entry_path.file_name()?))
}

fn thumb_file_name(entry_name: &OsStr) -> OsString {
    let mut name = entry_name.to_os_string();
    name.push(THUMB_EXTENSION);
    name
}

/// Visible `.png` names in `res_dir`, or `None` if there are none.
fn scan_res_dir(res_dir: &Path) -> Option<HashSet<OsString>> {
    let names: HashSet<OsString> = fs::read_dir(res_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.file_name())
        .filter(|name| {
            let text = name.to_string_lossy();
            !text.starts_with('.') && text.ends_with(THUMB_EXTENSION)
        })
        .collect();
    debug!(dir = %res_dir.display(), count = names.len(), "res cache: scanned");
    (!names.is_empty()).then_some(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_root(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("launcher-thumbs-res-{name}-{nonce}"))
    }

    fn rom_dir(root: &Path, system: &str, roms: &[&str], thumbs: &[&str]) -> PathBuf {
        let dir = root.join(system);
        let res = dir.join(RES_DIR_NAME);
        fs::create_dir_all(&res).expect("create res dir");
        for rom in roms {
            fs::write(dir.join(rom), "rom").expect("write rom");
        }
        for thumb in thumbs {
            fs::write(res.join(thumb), "png").expect("write thumb");
        }
        dir
    }

    #[test]
    fn finds_existing_thumbnail() {
        let root = test_root("exists");
        let dir = rom_dir(&root, "GB", &["Tetris.gb"], &["Tetris.gb.png"]);
        let mut cache = ResCache::new();

        assert!(cache.has_thumbnail(&dir.join("Tetris.gb")));
        assert_eq!(
            cache.thumb_path(&dir.join("Tetris.gb")),
            Some(dir.join(".res").join("Tetris.gb.png"))
        );
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_thumbnail_is_absent() {
        let root = test_root("missing");
        let dir = rom_dir(&root, "GB", &["Tetris.gb", "Zelda.gb"], &["Tetris.gb.png"]);
        let mut cache = ResCache::new();

        assert!(!cache.has_thumbnail(&dir.join("Zelda.gb")));
        assert_eq!(cache.thumb_path(&dir.join("Zelda.gb")), None);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn directory_without_res_folder_is_cached_as_empty() {
        let root = test_root("no-res");
        let dir = root.join("NES");
        fs::create_dir_all(&dir).expect("create dir");
        let mut cache = ResCache::new();

        assert!(!cache.has_thumbnail(&dir.join("Metroid.nes")));
        assert_eq!(cache.dir_count(), 1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn directory_is_scanned_once() {
        let root = test_root("scan-once");
        let dir = rom_dir(
            &root,
            "GB",
            &["Game1.gb", "Game2.gb", "Game3.gb"],
            &["Game1.gb.png", "Game2.gb.png"],
        );
        let mut cache = ResCache::new();

        assert!(cache.has_thumbnail(&dir.join("Game1.gb")));
        assert_eq!(cache.dir_count(), 1);

        // Added after the scan: invisible until the directory is invalidated.
        fs::write(dir.join(".res/Game3.gb.png"), "png").expect("write late thumb");
        assert!(cache.has_thumbnail(&dir.join("Game2.gb")));
        assert!(!cache.has_thumbnail(&dir.join("Game3.gb")));
        assert_eq!(cache.dir_count(), 1);

        cache.invalidate_dir(&dir);
        assert_eq!(cache.dir_count(), 0);
        assert!(cache.has_thumbnail(&dir.join("Game3.gb")));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn each_directory_is_cached_separately() {
        let root = test_root("multi");
        let gb = rom_dir(&root, "GB", &["Tetris.gb"], &["Tetris.gb.png"]);
        let gba = rom_dir(&root, "GBA", &["Mario.gba"], &["Mario.gba.png"]);
        let mut cache = ResCache::new();

        assert!(cache.has_thumbnail(&gb.join("Tetris.gb")));
        assert_eq!(cache.dir_count(), 1);
        assert!(cache.has_thumbnail(&gba.join("Mario.gba")));
        assert_eq!(cache.dir_count(), 2);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn directory_entries_use_parent_res_folder() {
        let root = test_root("dir-entry");
        fs::create_dir_all(root.join("GB")).expect("create system dir");
        fs::create_dir_all(root.join(RES_DIR_NAME)).expect("create res");
        fs::write(root.join(".res/GB.png"), "png").expect("write thumb");
        let mut cache = ResCache::new();

        assert_eq!(
            cache.thumb_path(&root.join("GB")),
            Some(root.join(".res").join("GB.png"))
        );
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn hidden_and_non_png_files_are_ignored() {
        let root = test_root("filters");
        let dir = rom_dir(
            &root,
            "GB",
            &["Game.gb", "Other.gb"],
            &[".hidden.gb.png", "Game.gb.png", "Other.gb.jpg"],
        );
        let mut cache = ResCache::new();

        assert!(cache.has_thumbnail(&dir.join("Game.gb")));
        assert!(!cache.has_thumbnail(&dir.join(".hidden.gb")));
        assert!(!cache.has_thumbnail(&dir.join("Other.gb")));
        let _ = fs::remove_dir_all(&root);
    }

    fn lookup<R: ThumbnailResolver>(resolver: &mut R, entry: &Path) -> (bool, Option<PathBuf>) {
        (resolver.has_thumbnail(entry), resolver.thumb_path(entry))
    }

    #[test]
    fn presence_and_path_agree_through_the_resolver_trait() {
        let root = test_root("trait");
        let dir = rom_dir(&root, "GB", &["Tetris.gb", "Zelda.gb"], &["Tetris.gb.png"]);
        let mut cache = ResCache::new();

        assert_eq!(
            lookup(&mut cache, &dir.join("Tetris.gb")),
            (true, Some(dir.join(".res").join("Tetris.gb.png")))
        );
        assert_eq!(lookup(&mut cache, &dir.join("Zelda.gb")), (false, None));
        assert_eq!(cache.dir_count(), 1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let mut cache = ResCache::new();
        assert!(!cache.has_thumbnail(Path::new("")));
        assert!(cache.thumb_path(Path::new("")).is_none());
        assert!(!cache.has_thumbnail(Path::new("nopath.gb")));
        assert!(!cache.has_thumbnail(Path::new("/Roms/GB/")));
        assert_eq!(cache.dir_count(), 0);
    }

    #[test]
    fn root_level_entry_is_looked_up() {
        let mut cache = ResCache::new();
        assert!(!cache.has_thumbnail(Path::new("/launcher-thumbs-no-such-game.gb")));
        assert_eq!(cache.dir_count(), 1);
    }

    #[test]
    fn clear_forgets_everything() {
        let root = test_root("clear");
        let dir = rom_dir(&root, "GB", &["Tetris.gb"], &["Tetris.gb.png"]);
        let mut cache = ResCache::new();
        assert!(cache.has_thumbnail(&dir.join("Tetris.gb")));

        cache.clear();
        assert_eq!(cache.dir_count(), 0);
        cache.clear();
        assert!(cache.has_thumbnail(&dir.join("Tetris.gb")));
        let _ = fs::remove_dir_all(&root);
    }
}
