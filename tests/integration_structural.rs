// tests/integration_structural.rs
//! Traces through the structural (AST subprocess) backend. These tests
//! self-skip when no Python runtime is installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pytrace::types::ReasonKind;
use pytrace::{trace, ParserChoice, TraceOptions};
use tempfile::TempDir;

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn options_for(root: &Path) -> TraceOptions {
    TraceOptions {
        base: Some(root.to_path_buf()),
        parser: ParserChoice::Structural,
        ..TraceOptions::default()
    }
}

#[test]
fn aliased_dynamic_bindings_are_tracked() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    // Only binding tracking can connect `im` back to importlib.
    let main = write(
        &root,
        "main.py",
        "from importlib import import_module as im\nim('plug')\n",
    );
    let plug = write(&root, "plug.py", "");

    let result = trace(&[main], &options_for(&root)).unwrap();
    assert!(result.files.contains(&plug));
    assert_eq!(result.reasons[&plug].kind, ReasonKind::DynamicImport);
}

#[test]
fn stdlib_imports_are_suppressed_not_unresolved() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let main = write(&root, "main.py", "import os\nimport json\nimport local_dep\n");
    let local = write(&root, "local_dep.py", "");

    let result = trace(&[main.clone()], &options_for(&root)).unwrap();

    assert!(result.files.contains(&local));
    assert!(!result.unresolved.contains_key("os"), "stdlib misses are suppressed");
    assert!(!result.unresolved.contains_key("json"));
    // Nothing under the stdlib root leaks in while inclusion is off.
    assert_eq!(result.files.len(), 2, "{:?}", result.files);
}

#[test]
fn runpy_keyword_aliases_are_accepted() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let main = write(
        &root,
        "main.py",
        "import runpy as rp\nrp.run_module(mod_name='tool')\nrp.run_path('scripts/job.py')\n",
    );
    let tool = write(&root, "tool.py", "");
    let job = write(&root, "scripts/job.py", "");

    let result = trace(&[main], &options_for(&root)).unwrap();
    assert!(result.files.contains(&tool));
    assert!(result.files.contains(&job));
}

#[test]
fn syntax_error_degrades_to_regex_with_warning() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let main = write(&root, "main.py", "import utils\ndef broken(:\n    pass\n");
    let utils = write(&root, "utils.py", "");

    let result = trace(&[main], &options_for(&root)).unwrap();
    assert!(result.files.contains(&utils), "regex fallback still finds the import");
    assert!(result.warnings.iter().any(|w| w.contains("fallback")), "{:?}", result.warnings);
}

#[test]
fn environment_probe_reports_a_version() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let env = pytrace::pyenv::probe("python3", std::time::Duration::from_secs(10));
    assert!(env.version.is_some());
    assert!(!env.stdlib_modules.is_empty());
    assert!(env.stdlib_modules.contains("os"));
}
