// src/watch/path_alias.rs

//! Mapping OS-reported paths back to the caller's logical paths.
//!
//! Change streams report canonical locations, while callers may watch a path
//! that goes through a symlink. Once a reported path has been matched it is
//! remembered, because a later delete event can no longer be canonicalized.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::fs::FileSystem;

/// Reported path -> logical path.
///
/// Each reported path maps to at most one logical path at a time; recording a
/// new mapping replaces the old one.
#[derive(Debug, Default)]
pub struct PathAliases {
    map: HashMap<PathBuf, PathBuf>,
}

impl PathAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, reported: PathBuf, logical: PathBuf) {
        self.map.insert(reported, logical);
    }

    /// Remove and return the mapping for `reported`.
    pub fn take(&mut self, reported: &Path) -> Option<PathBuf> {
        self.map.remove(reported)
    }

    #[cfg(test)]
    pub fn get(&self, reported: &Path) -> Option<&Path> {
        self.map.get(reported).map(PathBuf::as_path)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Record `canonical(file) -> file` for every watched file that exists.
    ///
    /// The first watched file wins when several share a canonical location,
    /// matching the search order of [`resolve_logical_path`].
    pub fn seed(&mut self, fs: &dyn FileSystem, files: &[PathBuf]) {
        let mut seeded: Vec<PathBuf> = Vec::new();
        for file in files {
            let Ok(canonical) = fs.canonicalize(file) else {
                continue;
            };
            if seeded.contains(&canonical) {
                continue;
            }
            self.map.insert(canonical.clone(), file.clone());
            seeded.push(canonical);
        }
    }
}

/// Resolve a reported path to one of the watched logical paths.
///
/// 1. If the reported path canonicalizes, find the first watched file with the
///    same canonical location and remember the mapping.
/// 2. Otherwise (typically a delete) consume a remembered mapping.
/// 3. Failing that, accept a reported path that is literally a watched path.
///
/// Anything else is a sibling outside the watch set and yields `None`.
pub fn resolve_logical_path(
    fs: &dyn FileSystem,
    files: &[PathBuf],
    aliases: &mut PathAliases,
    reported: &Path,
) -> Option<PathBuf> {
    if let Ok(canonical) = fs.canonicalize(reported) {
        let logical = files.iter().find(|file| {
            fs.canonicalize(file)
                .map(|c| c == canonical)
                .unwrap_or(false)
        })?;
        aliases.record(reported.to_path_buf(), logical.clone());
        return Some(logical.clone());
    }

    if let Some(logical) = aliases.take(reported) {
        trace!(?reported, ?logical, "resolved vanished path through alias");
        return Some(logical);
    }

    files.iter().find(|file| file.as_path() == reported).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn files(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn canonical_report_maps_to_symlinked_logical_path() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/cfg/a.json", b"{}".to_vec());
        fs.add_symlink("/cfg", "/real/cfg");
        let watched = files(&["/cfg/a.json"]);
        let mut aliases = PathAliases::new();

        let logical =
            resolve_logical_path(&fs, &watched, &mut aliases, Path::new("/real/cfg/a.json"));
        assert_eq!(logical, Some(PathBuf::from("/cfg/a.json")));
        assert_eq!(
            aliases.get(Path::new("/real/cfg/a.json")),
            Some(Path::new("/cfg/a.json"))
        );
    }

    #[test]
    fn deleted_path_is_resolved_once_through_alias() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/cfg/a.json", b"{}".to_vec());
        fs.add_symlink("/cfg", "/real/cfg");
        let watched = files(&["/cfg/a.json"]);
        let mut aliases = PathAliases::new();
        let reported = Path::new("/real/cfg/a.json");

        resolve_logical_path(&fs, &watched, &mut aliases, reported);
        fs.remove_file("/real/cfg/a.json");

        assert_eq!(
            resolve_logical_path(&fs, &watched, &mut aliases, reported),
            Some(PathBuf::from("/cfg/a.json"))
        );
        assert!(aliases.is_empty());
        assert_eq!(
            resolve_logical_path(&fs, &watched, &mut aliases, reported),
            None
        );
    }

    #[test]
    fn siblings_are_discarded() {
        let fs = MockFileSystem::new();
        fs.add_file("/cfg/a.json", b"{}".to_vec());
        fs.add_file("/cfg/notes.txt", b"hi".to_vec());
        let watched = files(&["/cfg/a.json"]);
        let mut aliases = PathAliases::new();

        assert_eq!(
            resolve_logical_path(&fs, &watched, &mut aliases, Path::new("/cfg/notes.txt")),
            None
        );
        assert_eq!(
            resolve_logical_path(&fs, &watched, &mut aliases, Path::new("/cfg/gone.txt")),
            None
        );
        assert!(aliases.is_empty());
    }

    #[test]
    fn literal_watched_path_resolves_without_alias() {
        let fs = MockFileSystem::new();
        let watched = files(&["/cfg/a.json"]);
        let mut aliases = PathAliases::new();

        assert_eq!(
            resolve_logical_path(&fs, &watched, &mut aliases, Path::new("/cfg/a.json")),
            Some(PathBuf::from("/cfg/a.json"))
        );
    }

    #[test]
    fn seed_keeps_first_logical_path_per_target() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/a.json", b"{}".to_vec());
        fs.add_symlink("/one/a.json", "/real/a.json");
        fs.add_symlink("/two/a.json", "/real/a.json");
        let watched = files(&["/one/a.json", "/two/a.json", "/missing.json"]);
        let mut aliases = PathAliases::new();

        aliases.seed(&fs, &watched);
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            aliases.get(Path::new("/real/a.json")),
            Some(Path::new("/one/a.json"))
        );
    }
}
