// src/types.rs
//! Common data structures: import records, resolution results, and the
//! trace result model.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Which runtime-import idiom a dynamic record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicKind {
    BuiltinImport,
    ImportlibImportModule,
    RunpyRunModule,
    RunpyRunPath,
}

/// A single imported name in a from-import, with its optional alias.
/// The sentinel name `*` denotes a wildcard import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    #[must_use]
    pub fn plain(name: &str) -> Self {
        Self { name: name.to_string(), alias: None }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

/// One import declaration extracted from source.
///
/// All branches of conditional/try/function/class contexts are reported;
/// the tracer treats source as a union of possibilities, never as control
/// flow to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRecord {
    /// `import a.b.c` / `import a.b.c as x`
    Plain {
        module: String,
        alias: Option<String>,
        line: usize,
    },
    /// `from base import x, y as z`; `base` may be empty when `level > 0`
    /// (the `from . import names` shape).
    From {
        base: String,
        level: usize,
        names: Vec<ImportedName>,
        line: usize,
    },
    /// A recognized runtime-import call. `module` (or `path` for the
    /// run-path variant) is filled when the first argument is a string
    /// literal; otherwise `expression` holds the source snippet.
    Dynamic {
        kind: DynamicKind,
        module: Option<String>,
        package: Option<String>,
        level: usize,
        path: Option<String>,
        expression: Option<String>,
        line: usize,
    },
}

impl ImportRecord {
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Plain { line, .. } | Self::From { line, .. } | Self::Dynamic { line, .. } => {
                *line
            }
        }
    }
}

/// What a module name resolved to on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A plain module file (`<name>.py`).
    File(PathBuf),
    /// A directory with an initializer; `init_path` is the file to include.
    RegularPackage { init_path: PathBuf, dir: PathBuf },
    /// A directory accepted as a namespace package. Recorded as a marker,
    /// never enumerated.
    NamespacePackage { dir: PathBuf },
    /// No candidate existed under any search root.
    Unresolved,
}

/// Why a file entered the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Entry,
    PlainImport,
    FromImport,
    RelativeImport,
    DynamicImport,
    NamespaceMarker,
}

impl ReasonKind {
    /// Label shown in the reasons view.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::PlainImport => "plain_import",
            Self::FromImport => "from_import",
            Self::RelativeImport => "relative_import",
            Self::DynamicImport => "dynamic_import",
            Self::NamespaceMarker => "namespace_marker",
        }
    }
}

/// Inclusion record for one file. Created on first discovery, mutated only
/// by parent accumulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReason {
    pub kind: ReasonKind,
    pub parents: BTreeSet<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    pub ignored: bool,
    /// True when the included file is a package initializer.
    pub package_init: bool,
}

impl FileReason {
    #[must_use]
    pub fn new(kind: ReasonKind, module_name: Option<String>) -> Self {
        Self {
            kind,
            parents: BTreeSet::new(),
            module_name,
            ignored: false,
            package_init: false,
        }
    }

    pub fn add_parent(&mut self, parent: &Path) {
        self.parents.insert(parent.to_path_buf());
    }
}

/// Result of a trace: the closed file set, per-file reasons, warnings, and
/// the imports nothing resolved.
#[derive(Debug, Clone)]
pub struct TraceResult {
    pub files: BTreeSet<PathBuf>,
    pub reasons: BTreeMap<PathBuf, FileReason>,
    pub warnings: Vec<String>,
    pub unresolved: BTreeMap<String, BTreeSet<PathBuf>>,
    pub base: PathBuf,
}

impl TraceResult {
    /// File list with paths rewritten relative to `base` where possible.
    #[must_use]
    pub fn relative_file_list(&self) -> BTreeSet<PathBuf> {
        self.files
            .iter()
            .map(|p| crate::paths::display_relative(p, &self.base))
            .collect()
    }
}
