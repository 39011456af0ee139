//! pytrace: static Python import tracer.
//!
//! Given a set of entry-point files, determines which files on disk are
//! required to run them by extracting import declarations, resolving each
//! to an on-disk artifact, and recursing over discovered files. Purely
//! static: no Python code is executed beyond the embedded AST helper.

pub mod cache;
pub mod extract;
pub mod helper;
pub mod output;
pub mod paths;
pub mod pyenv;
pub mod resolve;
pub mod trace;
pub mod types;
pub mod vfs;

use std::path::PathBuf;

use anyhow::Result;

pub use cache::TraceCache;
pub use extract::ParserChoice;
pub use trace::TraceOptions;
pub use types::{FileReason, ReasonKind, TraceResult};

/// Traces the dependency closure of the given entry files.
///
/// # Errors
/// Fails on an empty entry set, a missing entry file, or invalid options;
/// per-file trouble is recovered into the result's warnings.
pub fn trace(entry_files: &[PathBuf], options: &TraceOptions) -> Result<TraceResult> {
    trace::run(entry_files, options)
}
