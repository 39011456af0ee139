// src/extract/fallback.rs
//! Regex backend. Best-effort extraction used when the structural backend
//! is unavailable or fails on a file: a pre-pass blanks string literals
//! and comments while preserving newline offsets, physical lines are
//! joined into logical lines, and declaration shapes are matched per line.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{DynamicKind, ImportRecord, ImportedName};

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").expect("import regex"));
static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+([.\w]+)\s+import\s+(.+)$").expect("from regex"));
static MODULE_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w.]*)(?:\s+as\s+([A-Za-z_]\w*))?\s*$").expect("module regex")
});
static NAME_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\*|[A-Za-z_]\w*)(?:\s+as\s+([A-Za-z_]\w*))?\s*$").expect("name regex")
});

// Dynamic-import idioms. The structural backend tracks bindings; here we
// accept any receiver for the known call names and stay best-effort.
static DYN_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:([A-Za-z_]\w*)\s*\.\s*)?\b(__import__|import_module|run_module|run_path)\s*\(\s*(?:(name|mod_name|path_name)\s*=\s*)?(?:'([^'\n]*)'|"([^"\n]*)")"#,
    )
    .expect("dynamic literal regex")
});
static DYN_EXPR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:([A-Za-z_]\w*)\s*\.\s*)?\b(__import__|import_module|run_module|run_path)\s*\(\s*(?:(name|mod_name|path_name)\s*=\s*)?([A-Za-z_][\w.]*)\s*[,)]",
    )
    .expect("dynamic expression regex")
});

/// Extracts import records from raw source, ordered by line.
#[must_use]
pub fn extract_source(source: &str) -> Vec<ImportRecord> {
    let declarations = blank_noncode(source, false);
    let mut records = Vec::new();

    for (line_text, line_no) in logical_lines(&declarations) {
        if let Some(caps) = FROM_RE.captures(&line_text) {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let level = target.bytes().take_while(|&b| b == b'.').count();
            let base = target[level..].to_string();
            let names = parse_name_list(caps.get(2).map_or("", |m| m.as_str()));
            if !names.is_empty() {
                records.push(ImportRecord::From { base, level, names, line: line_no });
            }
        } else if let Some(caps) = IMPORT_RE.captures(&line_text) {
            for item in caps.get(1).map_or("", |m| m.as_str()).split(',') {
                if let Some(m) = MODULE_ITEM_RE.captures(item) {
                    records.push(ImportRecord::Plain {
                        module: m[1].to_string(),
                        alias: m.get(2).map(|a| a.as_str().to_string()),
                        line: line_no,
                    });
                }
            }
        }
    }

    // Dynamic idioms keep short string literals so the argument survives.
    let calls = blank_noncode(source, true);
    collect_dynamic(&calls, &mut records);

    records.sort_by_key(ImportRecord::line);
    records
}

fn parse_name_list(raw: &str) -> Vec<ImportedName> {
    let stripped: String = raw.chars().filter(|&c| c != '(' && c != ')').collect();
    stripped
        .split(',')
        .filter_map(|item| {
            NAME_ITEM_RE.captures(item).map(|m| ImportedName {
                name: m[1].to_string(),
                alias: m.get(2).map(|a| a.as_str().to_string()),
            })
        })
        .collect()
}

fn collect_dynamic(text: &str, records: &mut Vec<ImportRecord>) {
    for caps in DYN_LITERAL_RE.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        if preceded_by_def(text, start) {
            continue;
        }
        let func = &caps[2];
        let keyword = caps.get(3).map(|m| m.as_str());
        let Some(kind) = dynamic_kind(func, keyword) else { continue };
        let line = line_of(text, start);
        let literal = caps
            .get(4)
            .or_else(|| caps.get(5))
            .map_or(String::new(), |m| m.as_str().to_string());
        records.push(literal_record(kind, literal, line));
    }

    for caps in DYN_EXPR_RE.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        if preceded_by_def(text, start) {
            continue;
        }
        let func = &caps[2];
        let keyword = caps.get(3).map(|m| m.as_str());
        let Some(kind) = dynamic_kind(func, keyword) else { continue };
        let line = line_of(text, start);
        records.push(ImportRecord::Dynamic {
            kind,
            module: None,
            package: None,
            level: 0,
            path: None,
            expression: Some(caps[4].to_string()),
            line,
        });
    }
}

fn literal_record(kind: DynamicKind, literal: String, line: usize) -> ImportRecord {
    if kind == DynamicKind::RunpyRunPath {
        return ImportRecord::Dynamic {
            kind,
            module: None,
            package: None,
            level: 0,
            path: Some(literal),
            expression: None,
            line,
        };
    }
    let level = literal.bytes().take_while(|&b| b == b'.').count();
    ImportRecord::Dynamic {
        kind,
        module: Some(literal[level..].to_string()),
        package: None,
        level,
        path: None,
        expression: None,
        line,
    }
}

fn dynamic_kind(func: &str, keyword: Option<&str>) -> Option<DynamicKind> {
    let (kind, accepted) = match func {
        "__import__" => (DynamicKind::BuiltinImport, "name"),
        "import_module" => (DynamicKind::ImportlibImportModule, "name"),
        "run_module" => (DynamicKind::RunpyRunModule, "mod_name"),
        "run_path" => (DynamicKind::RunpyRunPath, "path_name"),
        _ => return None,
    };
    match keyword {
        Some(kw) if kw != accepted => None,
        _ => Some(kind),
    }
}

/// A call-shaped match right after `def` is a function definition.
fn preceded_by_def(text: &str, start: usize) -> bool {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..start].trim_end().ends_with("def")
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

/// Joins backslash-continued and open-parenthesis physical lines into
/// logical lines, keeping the starting line number of each.
fn logical_lines(text: &str) -> Vec<(String, usize)> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let start = i + 1;
        let mut logical = lines[i].to_string();
        loop {
            let trimmed = logical.trim_end();
            if let Some(stripped) = trimmed.strip_suffix('\\') {
                logical = stripped.to_string();
                if i + 1 < lines.len() {
                    i += 1;
                    logical.push(' ');
                    logical.push_str(lines[i]);
                    continue;
                }
                break;
            }
            if paren_balance(&logical) > 0 && i + 1 < lines.len() {
                i += 1;
                logical.push(' ');
                logical.push_str(lines[i]);
                continue;
            }
            break;
        }
        out.push((logical, start));
        i += 1;
    }
    out
}

fn paren_balance(text: &str) -> i64 {
    let mut balance = 0i64;
    for b in text.bytes() {
        match b {
            b'(' => balance += 1,
            b')' => balance -= 1,
            _ => {}
        }
    }
    balance
}

/// Blanks comments and string literals to spaces, preserving newlines so
/// line numbers stay faithful. With `keep_short_strings`, single-line
/// literals are copied through (the dynamic-idiom pass needs their text);
/// triple-quoted sections are always blanked.
fn blank_noncode(source: &str, keep_short_strings: bool) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }
        if c == '\'' || c == '"' {
            let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
            i = consume_string(&chars, i, c, triple, keep_short_strings && !triple, &mut out);
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Consumes one string literal starting at `start`, emitting either its
/// verbatim text or blanks. Returns the index just past the literal.
fn consume_string(
    chars: &[char],
    start: usize,
    quote: char,
    triple: bool,
    keep: bool,
    out: &mut String,
) -> usize {
    let delim_len = if triple { 3 } else { 1 };
    let mut emit = |c: char, out: &mut String| {
        if keep || c == '\n' {
            out.push(c);
        } else {
            out.push(' ');
        }
    };

    let mut i = start;
    for _ in 0..delim_len {
        emit(quote, out);
        i += 1;
    }

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            emit(c, out);
            emit(chars[i + 1], out);
            i += 2;
            continue;
        }
        if c == quote {
            if !triple {
                emit(c, out);
                return i + 1;
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                for _ in 0..3 {
                    emit(quote, out);
                }
                return i + 3;
            }
        }
        if !triple && c == '\n' {
            // Unterminated single-line literal; bail at the newline.
            out.push('\n');
            return i + 1;
        }
        emit(c, out);
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_modules(records: &[ImportRecord]) -> Vec<String> {
        records
            .iter()
            .filter_map(|r| match r {
                ImportRecord::Plain { module, .. } => Some(module.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn blanks_strings_but_keeps_newlines() {
        let src = "x = \"import fake\"\nimport real\n";
        let blanked = blank_noncode(src, false);
        assert_eq!(blanked.lines().count(), src.lines().count());
        assert!(!blanked.contains("fake"));
        let records = extract_source(src);
        assert_eq!(plain_modules(&records), vec!["real"]);
        assert_eq!(records[0].line(), 2);
    }

    #[test]
    fn triple_quoted_sections_never_match() {
        let src = "doc = '''\nimport phantom\n'''\nimport actual\n";
        let records = extract_source(src);
        assert_eq!(plain_modules(&records), vec!["actual"]);
        assert_eq!(records[0].line(), 4);
    }

    #[test]
    fn comments_are_ignored() {
        let src = "# import commented\nimport live  # trailing\n";
        assert_eq!(plain_modules(&extract_source(src)), vec!["live"]);
    }

    #[test]
    fn comma_separated_imports_split() {
        let records = extract_source("import math, random, time\n");
        assert_eq!(plain_modules(&records), vec!["math", "random", "time"]);
    }

    #[test]
    fn backslash_continuation_joins() {
        let src = "import os, \\\n    sys, \\\n    json\n";
        let records = extract_source(src);
        assert_eq!(plain_modules(&records), vec!["os", "sys", "json"]);
        assert!(records.iter().all(|r| r.line() == 1));
    }

    #[test]
    fn parenthesized_from_import_joins() {
        let src = "from typing import (\n    List,\n    Dict,\n    Optional,\n)\n";
        let records = extract_source(src);
        let ImportRecord::From { base, level, names, line } = &records[0] else {
            panic!("expected from record");
        };
        assert_eq!(base, "typing");
        assert_eq!(*level, 0);
        assert_eq!(*line, 1);
        let got: Vec<&str> = names.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(got, vec!["List", "Dict", "Optional"]);
    }

    #[test]
    fn relative_levels_and_empty_base() {
        let records = extract_source("from .. import thing\nfrom .sibling import x as y\n");
        let ImportRecord::From { base, level, .. } = &records[0] else { panic!() };
        assert_eq!((base.as_str(), *level), ("", 2));
        let ImportRecord::From { base, level, names, .. } = &records[1] else { panic!() };
        assert_eq!((base.as_str(), *level), ("sibling", 1));
        assert_eq!(names[0].alias.as_deref(), Some("y"));
    }

    #[test]
    fn wildcard_name() {
        let records = extract_source("from pkg import *\n");
        let ImportRecord::From { names, .. } = &records[0] else { panic!() };
        assert!(names[0].is_wildcard());
    }

    #[test]
    fn aliased_plain_import() {
        let records = extract_source("import numpy as np\n");
        let ImportRecord::Plain { module, alias, .. } = &records[0] else { panic!() };
        assert_eq!(module, "numpy");
        assert_eq!(alias.as_deref(), Some("np"));
    }

    #[test]
    fn dynamic_literal_calls() {
        let src = "\
import importlib\nimportlib.import_module('plugin')\n__import__(\"legacy\")\nrunpy.run_module(mod_name='tool')\nrunpy.run_path('scripts/job.py')\n";
        let records = extract_source(src);
        let dynamics: Vec<_> = records
            .iter()
            .filter_map(|r| match r {
                ImportRecord::Dynamic { kind, module, path, .. } => {
                    Some((*kind, module.clone(), path.clone()))
                }
                _ => None,
            })
            .collect();
        assert!(dynamics.contains(&(
            DynamicKind::ImportlibImportModule,
            Some("plugin".into()),
            None
        )));
        assert!(dynamics.contains(&(DynamicKind::BuiltinImport, Some("legacy".into()), None)));
        assert!(dynamics.contains(&(DynamicKind::RunpyRunModule, Some("tool".into()), None)));
        assert!(dynamics.contains(&(
            DynamicKind::RunpyRunPath,
            None,
            Some("scripts/job.py".into())
        )));
    }

    #[test]
    fn dynamic_non_literal_keeps_expression() {
        let records = extract_source("importlib.import_module(module_name)\n");
        let ImportRecord::Dynamic { module, expression, .. } = &records[0] else { panic!() };
        assert!(module.is_none());
        assert_eq!(expression.as_deref(), Some("module_name"));
    }

    #[test]
    fn dotted_dynamic_literal_sets_level() {
        let records = extract_source("import_module('.sub')\n");
        let ImportRecord::Dynamic { module, level, .. } = &records[0] else { panic!() };
        assert_eq!(module.as_deref(), Some("sub"));
        assert_eq!(*level, 1);
    }

    #[test]
    fn no_imports_yields_empty_list() {
        assert!(extract_source("x = 1\nprint(x)\n").is_empty());
    }
}
