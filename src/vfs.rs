// src/vfs.rs
//! Filesystem seam. The tracer never touches `std::fs` directly outside
//! this module, so callers can substitute a virtual tree for testing or
//! archive-backed deployments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Other,
}

pub trait Vfs: Send + Sync {
    /// Reads a file as UTF-8 text.
    ///
    /// # Errors
    /// Propagates the underlying I/O or encoding failure.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Stats a path. `Ok(None)` means the path does not exist.
    ///
    /// # Errors
    /// Only for failures other than not-found.
    fn stat(&self, path: &Path) -> io::Result<Option<FileKind>>;

    /// Lists the immediate children of a directory.
    ///
    /// # Errors
    /// Propagates the underlying I/O failure.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(Some(FileKind::File)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(Some(FileKind::Dir)))
    }
}

/// The real filesystem.
pub struct OsVfs {
    follow_symlinks: bool,
}

impl OsVfs {
    #[must_use]
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }
}

impl Vfs for OsVfs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FileKind>> {
        let meta = if self.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        match meta {
            Ok(m) => {
                let kind = if m.is_file() {
                    FileKind::File
                } else if m.is_dir() {
                    FileKind::Dir
                } else {
                    FileKind::Other
                };
                Ok(Some(kind))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            out.push(entry?.path());
        }
        Ok(out)
    }
}
