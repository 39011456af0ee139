// src/output.rs
//! Renderings of a trace result: plain file list, JSON mirroring the
//! result shape, and the per-file reasons view.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::paths;
use crate::types::{FileReason, TraceResult};

/// Newline-delimited file list, sorted.
#[must_use]
pub fn render_list(result: &TraceResult, relative: bool) -> String {
    let mut out = String::new();
    for file in result.files.iter() {
        let shown = display_path(file, result, relative);
        let _ = writeln!(out, "{shown}");
    }
    out
}

#[derive(Serialize)]
struct JsonView<'a> {
    files: Vec<String>,
    reasons: BTreeMap<String, &'a FileReason>,
    warnings: &'a [String],
    unresolved: BTreeMap<&'a str, Vec<String>>,
}

/// JSON object mirroring the result shape.
///
/// # Errors
/// Only on serialization failure (non-UTF-8 paths).
pub fn render_json(result: &TraceResult, relative: bool) -> Result<String> {
    let files = result
        .files
        .iter()
        .map(|f| display_path(f, result, relative))
        .collect();
    let reasons = result
        .reasons
        .iter()
        .map(|(path, reason)| (display_path(path, result, relative), reason))
        .collect();
    let unresolved = result
        .unresolved
        .iter()
        .map(|(module, importers)| {
            let shown = importers.iter().map(|p| display_path(p, result, relative)).collect();
            (module.as_str(), shown)
        })
        .collect();
    let view = JsonView { files, reasons, warnings: &result.warnings, unresolved };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// One line per file with its inclusion reason and parents.
#[must_use]
pub fn render_reasons(result: &TraceResult, relative: bool) -> String {
    let mut out = String::new();
    for file in result.files.iter() {
        let shown = display_path(file, result, relative);
        let Some(reason) = result.reasons.get(file) else {
            let _ = writeln!(out, "{shown}");
            continue;
        };
        let kind = format!("[{}]", reason.kind.label()).cyan();
        let _ = write!(out, "{shown}  {kind}");
        if let Some(module) = &reason.module_name {
            let _ = write!(out, " {}", module.dimmed());
        }
        if !reason.parents.is_empty() {
            let _ = write!(out, " from: {}", parent_summary(reason, result, relative));
        }
        let _ = writeln!(out);
    }
    out
}

fn parent_summary(reason: &FileReason, result: &TraceResult, relative: bool) -> String {
    let mut parents: Vec<String> = reason
        .parents
        .iter()
        .take(3)
        .map(|p| display_path(p, result, relative))
        .collect();
    if reason.parents.len() > 3 {
        parents.push(format!("(+{} more)", reason.parents.len() - 3));
    }
    parents.join(", ")
}

fn display_path(path: &Path, result: &TraceResult, relative: bool) -> String {
    if relative {
        paths::display_relative(path, &result.base).display().to_string()
    } else {
        path.display().to_string()
    }
}
