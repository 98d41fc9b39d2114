// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Default)]
struct MockTree {
    files: HashMap<PathBuf, Vec<u8>>,
    // link path -> target path
    links: HashMap<PathBuf, PathBuf>,
}

impl MockTree {
    /// Follow symlinks on every prefix of `path` until none applies.
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            match self.first_link_prefix(&current) {
                Some((prefix, target)) => {
                    let rest = current.strip_prefix(&prefix).ok()?;
                    current = if rest.as_os_str().is_empty() {
                        target
                    } else {
                        target.join(rest)
                    };
                }
                None => return Some(current),
            }
        }
        None
    }

    fn first_link_prefix(&self, path: &Path) -> Option<(PathBuf, PathBuf)> {
        let mut prefix = PathBuf::new();
        for component in path.components() {
            prefix.push(component);
            if let Some(target) = self.links.get(&prefix) {
                return Some((prefix, target.clone()));
            }
        }
        None
    }

    fn exists(&self, resolved: &Path) -> bool {
        self.files.contains_key(resolved)
            || self.files.keys().any(|f| f.starts_with(resolved))
    }
}

/// In-memory filesystem with files and symlinks.
///
/// Directories are implicit: a directory exists while at least one file lives
/// below it. Clones share the same tree, so a test can keep a handle and
/// mutate files underneath a running monitor.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    tree: Arc<Mutex<MockTree>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or overwrite a file. Writes through symlinked directories land
    /// on the link target.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut tree = self.lock();
        let target = tree
            .resolve(path.as_ref())
            .unwrap_or_else(|| path.as_ref().to_path_buf());
        tree.files.insert(target, content.into());
    }

    /// Remove a file; returns whether it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let mut tree = self.lock();
        match tree.resolve(path.as_ref()) {
            Some(target) => tree.files.remove(&target).is_some(),
            None => false,
        }
    }

    /// Point `link` at `target` (either a file or a directory).
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let mut tree = self.lock();
        tree.links
            .insert(link.as_ref().to_path_buf(), target.as_ref().to_path_buf());
    }

    pub fn remove_symlink(&self, link: impl AsRef<Path>) -> bool {
        self.lock().links.remove(link.as_ref()).is_some()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.lock();
        let resolved = tree
            .resolve(path)
            .ok_or_else(|| anyhow!("Too many levels of symbolic links: {:?}", path))?;
        match tree.files.get(&resolved) {
            Some(content) => Ok(content.clone()),
            None if tree.exists(&resolved) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let tree = self.lock();
        let resolved = tree
            .resolve(path)
            .ok_or_else(|| anyhow!("Too many levels of symbolic links: {:?}", path))?;
        if tree.exists(&resolved) {
            Ok(resolved)
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_through_file_and_directory_links() {
        let fs = MockFileSystem::new();
        fs.add_file("/real/cfg/a.json", b"{}".to_vec());
        fs.add_symlink("/cfg", "/real/cfg");
        fs.add_symlink("/alias.json", "/cfg/a.json");

        assert_eq!(fs.read(Path::new("/cfg/a.json")).unwrap(), b"{}");
        assert_eq!(fs.read(Path::new("/alias.json")).unwrap(), b"{}");
        assert_eq!(
            fs.canonicalize(Path::new("/alias.json")).unwrap(),
            PathBuf::from("/real/cfg/a.json")
        );
        assert_eq!(
            fs.canonicalize(Path::new("/cfg")).unwrap(),
            PathBuf::from("/real/cfg")
        );
    }

    #[test]
    fn missing_paths_fail() {
        let fs = MockFileSystem::new();
        fs.add_file("/cfg/a.json", b"x".to_vec());
        assert!(fs.canonicalize(Path::new("/cfg/b.json")).is_err());
        assert!(fs.read(Path::new("/cfg")).is_err());

        assert!(fs.remove_file("/cfg/a.json"));
        assert!(fs.canonicalize(Path::new("/cfg/a.json")).is_err());
        assert!(!fs.remove_file("/cfg/a.json"));
    }

    #[test]
    fn link_cycles_do_not_hang() {
        let fs = MockFileSystem::new();
        fs.add_symlink("/a", "/b");
        fs.add_symlink("/b", "/a");
        assert!(fs.canonicalize(Path::new("/a/file")).is_err());
    }
}
