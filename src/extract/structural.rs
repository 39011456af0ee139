// src/extract/structural.rs
//! Structural backend: hands the source to the target runtime's own parser
//! through the embedded helper and maps the JSON listing onto records.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::helper;
use crate::types::{DynamicKind, ImportRecord, ImportedName};

#[derive(Deserialize)]
struct ParseReply {
    #[serde(default)]
    imports: Vec<PlainEntry>,
    #[serde(default)]
    from_imports: Vec<FromEntry>,
    #[serde(default)]
    dynamic_imports: Vec<DynamicEntry>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct PlainEntry {
    module: String,
    alias: Option<String>,
    line: usize,
}

#[derive(Deserialize)]
struct FromEntry {
    base: String,
    #[serde(default)]
    level: usize,
    names: Vec<NameEntry>,
    line: usize,
}

#[derive(Deserialize)]
struct NameEntry {
    name: String,
    alias: Option<String>,
}

#[derive(Deserialize)]
struct DynamicEntry {
    kind: String,
    module: Option<String>,
    package: Option<String>,
    #[serde(default)]
    level: usize,
    path: Option<String>,
    expression: Option<String>,
    line: usize,
}

#[derive(Deserialize)]
struct ErrorEntry {
    message: String,
    line: usize,
}

pub struct StructuralOutcome {
    /// Records ordered by file position.
    pub records: Vec<ImportRecord>,
    /// Parse errors reported by the runtime's parser.
    pub errors: Vec<String>,
}

/// Parses `source` with the helper's `parse` subcommand.
///
/// # Errors
/// Fails when the helper cannot be run or replies with malformed JSON;
/// the caller degrades to the regex backend in that case.
pub fn extract(runtime: &str, source: &str, timeout: Duration) -> Result<StructuralOutcome> {
    let reply = helper::run(runtime, "parse", Some(source), timeout)?;
    let parsed: ParseReply =
        serde_json::from_str(&reply).context("helper returned malformed parse listing")?;

    let mut records = Vec::new();
    for entry in parsed.imports {
        records.push(ImportRecord::Plain {
            module: entry.module,
            alias: entry.alias,
            line: entry.line,
        });
    }
    for entry in parsed.from_imports {
        records.push(ImportRecord::From {
            base: entry.base,
            level: entry.level,
            names: entry
                .names
                .into_iter()
                .map(|n| ImportedName { name: n.name, alias: n.alias })
                .collect(),
            line: entry.line,
        });
    }
    for entry in parsed.dynamic_imports {
        let Some(kind) = dynamic_kind(&entry.kind) else { continue };
        records.push(ImportRecord::Dynamic {
            kind,
            module: entry.module,
            package: entry.package,
            level: entry.level,
            path: entry.path,
            expression: entry.expression,
            line: entry.line,
        });
    }
    records.sort_by_key(ImportRecord::line);

    let errors = parsed
        .errors
        .into_iter()
        .map(|e| format!("line {}: {}", e.line, e.message))
        .collect();

    Ok(StructuralOutcome { records, errors })
}

fn dynamic_kind(token: &str) -> Option<DynamicKind> {
    match token {
        "builtin_import" => Some(DynamicKind::BuiltinImport),
        "importlib_import_module" => Some(DynamicKind::ImportlibImportModule),
        "runpy_run_module" => Some(DynamicKind::RunpyRunModule),
        "runpy_run_path" => Some(DynamicKind::RunpyRunPath),
        _ => None,
    }
}
