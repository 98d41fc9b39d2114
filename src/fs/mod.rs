// src/fs/mod.rs

//! Filesystem primitives the monitor consumes: whole-file reads and path
//! canonicalization. Kept behind a trait so tests can swap in [`mock`].

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Read the full content of `path`.
    ///
    /// Any failure (missing file, directory, permissions) is an error; the
    /// caller decides whether that means "absent".
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Resolve `path` through symlinks to its unique real location.
    ///
    /// Fails for paths that do not exist.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }
}
