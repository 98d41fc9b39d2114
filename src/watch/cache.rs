// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::types::FileBody;

/// Result of re-reading one watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    /// Content differs from the previous snapshot (including presence flips).
    pub changed: bool,
    /// Freshly read content; `None` means the file does not exist.
    pub body: Option<FileBody>,
}

impl ContentUpdate {
    fn unchanged(body: Option<FileBody>) -> Self {
        Self {
            changed: false,
            body,
        }
    }
}

/// Last-seen content of every watched file.
///
/// There is exactly one snapshot per watched path from construction on; a
/// file that is absent when the monitor starts has an absent snapshot, so it
/// produces nothing until it appears.
#[derive(Debug)]
pub struct FileContentCache {
    snapshots: HashMap<PathBuf, Option<FileBody>>,
}

impl FileContentCache {
    pub fn new<P: AsRef<Path>>(files: &[P]) -> Self {
        let snapshots = files
            .iter()
            .map(|f| (f.as_ref().to_path_buf(), None))
            .collect();
        Self { snapshots }
    }

    /// Current snapshot for a watched path. The outer `None` means the path
    /// is not watched.
    pub fn snapshot(&self, path: &Path) -> Option<Option<FileBody>> {
        self.snapshots.get(path).cloned()
    }

    /// Re-read `path` and compare it byte for byte with its snapshot.
    ///
    /// The snapshot is overwritten with the fresh read whatever the verdict.
    /// Unwatched paths are never read and never gain a snapshot.
    pub fn update(&mut self, fs: &dyn FileSystem, path: &Path) -> ContentUpdate {
        let Some(previous) = self.snapshots.get_mut(path) else {
            trace!(?path, "ignoring update for unwatched path");
            return ContentUpdate::unchanged(None);
        };

        let body: Option<FileBody> = match fs.read(path) {
            Ok(bytes) => Some(bytes.into()),
            Err(err) => {
                // Missing or unreadable files count as absent.
                trace!(?path, error = %err, "read failed; treating file as absent");
                None
            }
        };

        let changed = match (previous.as_deref(), body.as_deref()) {
            (None, None) => false,
            (Some(old), Some(new)) => old != new,
            _ => true,
        };

        if changed {
            debug!(
                ?path,
                present = body.is_some(),
                len = body.as_ref().map_or(0, |b| b.len()),
                "file content changed"
            );
        }

        *previous = body.clone();
        ContentUpdate { changed, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const A: &str = "/cfg/a.json";

    #[test]
    fn absent_file_stays_unchanged() {
        let fs = MockFileSystem::new();
        let mut cache = FileContentCache::new(&[A]);

        let update = cache.update(&fs, Path::new(A));
        assert!(!update.changed);
        assert_eq!(update.body, None);
        assert_eq!(cache.snapshot(Path::new(A)), Some(None));
    }

    #[test]
    fn identical_rewrite_is_not_a_change() {
        let fs = MockFileSystem::new();
        let mut cache = FileContentCache::new(&[A]);

        fs.add_file(A, br#"{"x":1}"#.to_vec());
        let first = cache.update(&fs, Path::new(A));
        assert!(first.changed);
        assert_eq!(first.body.as_deref(), Some(br#"{"x":1}"#.as_slice()));

        fs.add_file(A, br#"{"x":1}"#.to_vec());
        assert!(!cache.update(&fs, Path::new(A)).changed);
    }

    #[test]
    fn presence_transitions_are_changes() {
        let fs = MockFileSystem::new();
        let mut cache = FileContentCache::new(&[A]);

        fs.add_file(A, b"one".to_vec());
        assert!(cache.update(&fs, Path::new(A)).changed);

        fs.remove_file(A);
        let removed = cache.update(&fs, Path::new(A));
        assert!(removed.changed);
        assert_eq!(removed.body, None);

        fs.add_file(A, b"two".to_vec());
        let recreated = cache.update(&fs, Path::new(A));
        assert!(recreated.changed);
        assert_eq!(recreated.body.as_deref(), Some(b"two".as_slice()));
    }

    #[test]
    fn empty_file_differs_from_missing_file() {
        let fs = MockFileSystem::new();
        let mut cache = FileContentCache::new(&[A]);

        fs.add_file(A, Vec::new());
        let update = cache.update(&fs, Path::new(A));
        assert!(update.changed);
        assert_eq!(update.body.as_deref(), Some(&[][..]));
    }

    #[test]
    fn unwatched_paths_are_ignored() {
        let fs = MockFileSystem::new();
        fs.add_file("/cfg/other.json", b"x".to_vec());
        let mut cache = FileContentCache::new(&[A]);

        let update = cache.update(&fs, Path::new("/cfg/other.json"));
        assert!(!update.changed);
        assert_eq!(cache.snapshot(Path::new("/cfg/other.json")), None);
    }
}
