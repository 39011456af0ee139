// src/resolve.rs
//! Module resolution: maps a dotted (possibly relative) module name to an
//! on-disk artifact by walking the search roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::TraceCache;
use crate::types::Resolution;
use crate::vfs::Vfs;

pub struct Resolver {
    vfs: Arc<dyn Vfs>,
    cache: Arc<TraceCache>,
    /// Absolute-import roots after the importing directory: base,
    /// base/src, extra roots, site roots, stdlib root.
    roots: Vec<PathBuf>,
    stdlib: HashSet<String>,
    include_stdlib: bool,
}

impl Resolver {
    #[must_use]
    pub fn new(
        vfs: Arc<dyn Vfs>,
        cache: Arc<TraceCache>,
        roots: Vec<PathBuf>,
        stdlib: HashSet<String>,
        include_stdlib: bool,
    ) -> Self {
        Self { vfs, cache, roots, stdlib, include_stdlib }
    }

    /// Whether an absolute module name is short-circuited as a
    /// standard-library member under the current policy.
    #[must_use]
    pub fn is_suppressed_stdlib(&self, module: &str) -> bool {
        if self.include_stdlib {
            return false;
        }
        let top = module.split('.').next().unwrap_or(module);
        self.stdlib.contains(top)
    }

    /// Resolves a module name in the context of the importing file.
    /// Memoized on `(module, level, importing directory)`: co-located
    /// sources resolve identically.
    #[must_use]
    pub fn resolve(&self, module: &str, level: usize, importing_file: &Path) -> Resolution {
        let importing_dir =
            importing_file.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();
        let key = (module.to_string(), level, importing_dir.clone());
        if let Some(hit) = self.cache.resolution(&key) {
            return hit;
        }
        let resolution = if level > 0 {
            self.resolve_relative(module, level, &importing_dir)
        } else {
            self.resolve_absolute(module, &importing_dir)
        };
        self.cache.store_resolution(key, resolution)
    }

    fn resolve_absolute(&self, module: &str, importing_dir: &Path) -> Resolution {
        if module.is_empty() || self.is_suppressed_stdlib(module) {
            return Resolution::Unresolved;
        }
        let parts: Vec<&str> = module.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Resolution::Unresolved;
        }
        for root in std::iter::once(importing_dir).chain(self.roots.iter().map(PathBuf::as_path)) {
            let hit = self.walk(root, &parts);
            if hit != Resolution::Unresolved {
                return hit;
            }
        }
        Resolution::Unresolved
    }

    /// Relative imports ignore the search roots: climb `level - 1`
    /// parents from the importing directory, then walk from there alone.
    fn resolve_relative(&self, module: &str, level: usize, importing_dir: &Path) -> Resolution {
        let mut dir = importing_dir.to_path_buf();
        for _ in 0..level.saturating_sub(1) {
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return Resolution::Unresolved,
            }
        }
        if module.is_empty() {
            // `from . import names` resolves the derived directory itself.
            return self.probe_dir(&dir);
        }
        let parts: Vec<&str> = module.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Resolution::Unresolved;
        }
        self.walk(&dir, &parts)
    }

    fn walk(&self, root: &Path, parts: &[&str]) -> Resolution {
        let Some((last, init)) = parts.split_last() else {
            return Resolution::Unresolved;
        };
        let mut dir = root.to_path_buf();
        for part in init {
            dir.push(part);
            if !self.vfs.is_dir(&dir) {
                return Resolution::Unresolved;
            }
        }
        self.probe(&dir, last)
    }

    /// Probes one name under a directory: `<name>.py` first, then
    /// `<name>/__init__.py`, then the namespace-package rule. Also used
    /// for from-import submodule promotion.
    #[must_use]
    pub fn probe(&self, dir: &Path, name: &str) -> Resolution {
        let file = dir.join(format!("{name}.py"));
        if self.vfs.is_file(&file) {
            return Resolution::File(file);
        }
        self.probe_dir(&dir.join(name))
    }

    fn probe_dir(&self, dir: &Path) -> Resolution {
        let init = dir.join("__init__.py");
        if self.vfs.is_file(&init) {
            return Resolution::RegularPackage { init_path: init, dir: dir.to_path_buf() };
        }
        if self.vfs.is_dir(dir) && self.has_member(dir) {
            return Resolution::NamespacePackage { dir: dir.to_path_buf() };
        }
        Resolution::Unresolved
    }

    /// A directory qualifies as a namespace package when it holds at
    /// least one target-language file or subdirectory.
    fn has_member(&self, dir: &Path) -> bool {
        self.vfs
            .list_dir(dir)
            .map(|entries| {
                entries.iter().any(|entry| {
                    self.vfs.is_dir(entry)
                        || entry.extension().map_or(false, |ext| ext == "py")
                })
            })
            .unwrap_or(false)
    }
}
