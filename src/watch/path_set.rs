// src/watch/path_set.rs

//! Derive the directories to subscribe to from the watched file list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Syntactic parent directory of `file`, without touching the filesystem.
///
/// A bare file name (`"a.json"`) lives in `"."`; a file directly under the
/// root (`"/a.json"`) lives in `"/"`.
pub fn dirname(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => file.to_path_buf(),
    }
}

/// Unique containing directories of `files`, in first-seen order.
///
/// Duplicate input paths are fine; they collapse to one directory.
pub fn watched_directories<P: AsRef<Path>>(files: &[P]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut directories = Vec::new();
    for file in files {
        let dir = dirname(file.as_ref());
        if seen.insert(dir.clone()) {
            directories.push(dir);
        }
    }
    directories
}
