// src/pyenv.rs
//! Environment probe: one snapshot per trace of the target runtime's
//! search roots, standard-library names, and site-package roots.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::helper;

/// Snapshot of the interrogated runtime. Filesystem changes after the
/// probe do not retroactively influence a running trace.
#[derive(Debug, Clone, Default)]
pub struct PyEnv {
    pub version: Option<String>,
    pub search_roots: Vec<PathBuf>,
    pub stdlib_root: Option<PathBuf>,
    pub site_roots: Vec<PathBuf>,
    pub stdlib_modules: HashSet<String>,
    /// Probe-time warnings, drained into the trace result once.
    pub warnings: Vec<String>,
}

impl PyEnv {
    /// The no-runtime environment: stdlib identification is structurally
    /// disabled, so unresolved top-level modules surface as unresolved
    /// instead of being silently suppressed.
    #[must_use]
    pub fn offline() -> Self {
        Self::default()
    }

    /// Whether the top-level component of an absolute module name belongs
    /// to the standard library.
    #[must_use]
    pub fn is_stdlib(&self, module: &str) -> bool {
        let top = module.split('.').next().unwrap_or(module);
        self.stdlib_modules.contains(top)
    }
}

#[derive(Deserialize)]
struct EnvReply {
    version: String,
    search_roots: Vec<String>,
    stdlib_root: String,
    site_roots: Vec<String>,
}

/// Interrogates the runtime with the helper's `env` and `stdlib`
/// subcommands. Best-effort: a missing or broken runtime yields the
/// offline environment plus a warning.
#[must_use]
pub fn probe(runtime: &str, timeout: Duration) -> PyEnv {
    let mut env = PyEnv::offline();

    match helper::run(runtime, "env", None, timeout) {
        Ok(reply) => match serde_json::from_str::<EnvReply>(&reply) {
            Ok(parsed) => {
                env.version = Some(parsed.version);
                env.search_roots = parsed.search_roots.into_iter().map(PathBuf::from).collect();
                if !parsed.stdlib_root.is_empty() {
                    env.stdlib_root = Some(PathBuf::from(parsed.stdlib_root));
                }
                env.site_roots = parsed.site_roots.into_iter().map(PathBuf::from).collect();
            }
            Err(e) => env.warnings.push(format!("runtime probe returned malformed env: {e}")),
        },
        Err(e) => {
            env.warnings.push(format!("runtime probe failed ({e}); stdlib detection disabled"));
            return env;
        }
    }

    match helper::run(runtime, "stdlib", None, timeout) {
        Ok(reply) => match serde_json::from_str::<Vec<String>>(&reply) {
            Ok(names) => env.stdlib_modules = names.into_iter().collect(),
            Err(e) => env.warnings.push(format!("runtime probe returned malformed stdlib list: {e}")),
        },
        Err(e) => env.warnings.push(format!("stdlib probe failed: {e}")),
    }

    env
}
