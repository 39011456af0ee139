// src/cache.rs
//! Shared caches for a trace. Callers may hold an `Arc<TraceCache>` across
//! traces of the same project; the orchestrator writes through it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::pyenv::PyEnv;
use crate::types::{ImportRecord, Resolution};

/// Memo key for resolved modules. Keyed on the importing *directory*
/// rather than the file: co-located sources resolve identically, which
/// raises the hit rate substantially on real projects.
pub type ResolveKey = (String, usize, PathBuf);

#[derive(Default)]
pub struct TraceCache {
    contents: Mutex<HashMap<PathBuf, Arc<str>>>,
    parsed: Mutex<HashMap<PathBuf, Arc<[ImportRecord]>>>,
    resolved: Mutex<HashMap<ResolveKey, Resolution>>,
    env: OnceLock<PyEnv>,
}

impl TraceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self, path: &Path) -> Option<Arc<str>> {
        self.contents.lock().expect("cache lock").get(path).cloned()
    }

    pub fn store_content(&self, path: &Path, text: &str) -> Arc<str> {
        let mut map = self.contents.lock().expect("cache lock");
        map.entry(path.to_path_buf()).or_insert_with(|| Arc::from(text)).clone()
    }

    pub fn imports(&self, path: &Path) -> Option<Arc<[ImportRecord]>> {
        self.parsed.lock().expect("cache lock").get(path).cloned()
    }

    pub fn store_imports(&self, path: &Path, records: Vec<ImportRecord>) -> Arc<[ImportRecord]> {
        let mut map = self.parsed.lock().expect("cache lock");
        map.entry(path.to_path_buf()).or_insert_with(|| Arc::from(records)).clone()
    }

    pub fn resolution(&self, key: &ResolveKey) -> Option<Resolution> {
        self.resolved.lock().expect("cache lock").get(key).cloned()
    }

    pub fn store_resolution(&self, key: ResolveKey, resolution: Resolution) -> Resolution {
        let mut map = self.resolved.lock().expect("cache lock");
        map.entry(key).or_insert(resolution).clone()
    }

    /// The probed environment, shared for the cache's lifetime. The first
    /// caller pays for the probe; later traces reuse the snapshot.
    pub fn env_or_probe<F>(&self, probe: F) -> &PyEnv
    where
        F: FnOnce() -> PyEnv,
    {
        self.env.get_or_init(probe)
    }
}
