// src/trace/options.rs
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TraceCache;
use crate::extract::ParserChoice;
use crate::helper;
use crate::vfs::Vfs;

/// Options for a trace. `Default` gives the documented defaults.
#[derive(Clone)]
pub struct TraceOptions {
    /// Anchor for relative-path reporting and ignore-pattern matching.
    /// Defaults to the current working directory.
    pub base: Option<PathBuf>,
    /// Appended to the absolute-import search path after `base`.
    pub extra_search_roots: Vec<PathBuf>,
    /// Command used to invoke the target runtime for probing and the
    /// structural backend. `None` runs fully offline: no probe, no
    /// subprocesses, regex backend only.
    pub runtime: Option<String>,
    /// Dereference symlinks during path normalization and stat calls.
    pub follow_symlinks: bool,
    /// Glob patterns; matched files keep `ignored = true` reasons and
    /// their imports are not traversed.
    pub ignore: Vec<String>,
    /// Guard against pathological graphs.
    pub max_depth: usize,
    /// Make standard-library modules resolvable and traced.
    pub include_stdlib: bool,
    /// Keep site-installed roots on the search path.
    pub include_site_packages: bool,
    /// Follow recognized runtime-import idioms.
    pub analyze_dynamic: bool,
    /// Upper bound on parallel file I/O and backend subprocess calls.
    pub file_io_concurrency: usize,
    /// Backend selection hint for the import extractor.
    pub parser: ParserChoice,
    /// Wall-clock budget per helper subprocess invocation.
    pub helper_timeout: Duration,
    /// Reusable cache container for multi-trace workflows.
    pub cache: Option<Arc<TraceCache>>,
    /// Filesystem override (virtual trees, tests).
    pub vfs: Option<Arc<dyn Vfs>>,
    /// Cooperative cancellation. Once set, in-flight tasks drain and the
    /// accumulated partial result is returned; it still satisfies the
    /// result invariants.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            base: None,
            extra_search_roots: Vec::new(),
            runtime: Some(default_runtime().to_string()),
            follow_symlinks: true,
            ignore: Vec::new(),
            max_depth: 100,
            include_stdlib: false,
            include_site_packages: true,
            analyze_dynamic: true,
            file_io_concurrency: 1024,
            parser: ParserChoice::Auto,
            helper_timeout: helper::DEFAULT_TIMEOUT,
            cache: None,
            vfs: None,
            cancel: None,
        }
    }
}

impl TraceOptions {
    /// Offline preset: no runtime probe, regex backend, deterministic.
    #[must_use]
    pub fn offline() -> Self {
        Self { runtime: None, parser: ParserChoice::Regex, ..Self::default() }
    }
}

#[must_use]
fn default_runtime() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}
