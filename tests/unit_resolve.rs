// tests/unit_resolve.rs
//! Resolver walk behavior against real fixture trees.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pytrace::cache::TraceCache;
use pytrace::resolve::Resolver;
use pytrace::types::Resolution;
use pytrace::vfs::OsVfs;
use tempfile::TempDir;

// --- Helpers ---

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

fn resolver_for(root: &Path, stdlib: &[&str], include_stdlib: bool) -> Resolver {
    Resolver::new(
        Arc::new(OsVfs::new(true)),
        Arc::new(TraceCache::new()),
        vec![root.to_path_buf()],
        stdlib.iter().map(|s| (*s).to_string()).collect::<HashSet<String>>(),
        include_stdlib,
    )
}

fn fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

// --- Absolute imports ---

#[test]
fn resolves_plain_module() {
    let (_dir, root) = fixture();
    touch(&root.join("utils.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("utils", 0, &root.join("main.py"));
    assert_eq!(got, Resolution::File(root.join("utils.py")));
}

#[test]
fn resolves_regular_package() {
    let (_dir, root) = fixture();
    touch(&root.join("models/__init__.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("models", 0, &root.join("main.py"));
    assert_eq!(
        got,
        Resolution::RegularPackage {
            init_path: root.join("models/__init__.py"),
            dir: root.join("models"),
        }
    );
}

#[test]
fn resolves_submodule_of_package() {
    let (_dir, root) = fixture();
    touch(&root.join("models/__init__.py"));
    touch(&root.join("models/user.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("models.user", 0, &root.join("main.py"));
    assert_eq!(got, Resolution::File(root.join("models/user.py")));
}

#[test]
fn module_file_wins_over_package_dir() {
    let (_dir, root) = fixture();
    touch(&root.join("thing.py"));
    touch(&root.join("thing/__init__.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("thing", 0, &root.join("main.py"));
    assert_eq!(got, Resolution::File(root.join("thing.py")));
}

#[test]
fn missing_module_is_unresolved() {
    let (_dir, root) = fixture();
    let resolver = resolver_for(&root, &[], false);
    assert_eq!(resolver.resolve("nonexistent", 0, &root.join("main.py")), Resolution::Unresolved);
}

#[test]
fn intermediate_component_must_be_directory() {
    let (_dir, root) = fixture();
    touch(&root.join("a.py"));

    let resolver = resolver_for(&root, &[], false);
    assert_eq!(resolver.resolve("a.b", 0, &root.join("main.py")), Resolution::Unresolved);
}

#[test]
fn importing_directory_is_searched_first() {
    let (_dir, root) = fixture();
    touch(&root.join("shared.py"));
    touch(&root.join("sub/shared.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("shared", 0, &root.join("sub/consumer.py"));
    assert_eq!(got, Resolution::File(root.join("sub/shared.py")));
}

// --- Namespace packages ---

#[test]
fn directory_with_member_is_namespace_package() {
    let (_dir, root) = fixture();
    touch(&root.join("ns/thing.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("ns", 0, &root.join("main.py"));
    assert_eq!(got, Resolution::NamespacePackage { dir: root.join("ns") });
}

#[test]
fn empty_directory_is_not_a_namespace_package() {
    let (_dir, root) = fixture();
    fs::create_dir_all(root.join("hollow")).unwrap();

    let resolver = resolver_for(&root, &[], false);
    assert_eq!(resolver.resolve("hollow", 0, &root.join("main.py")), Resolution::Unresolved);
}

#[test]
fn namespace_child_still_resolves_directly() {
    let (_dir, root) = fixture();
    touch(&root.join("ns/thing.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("ns.thing", 0, &root.join("main.py"));
    assert_eq!(got, Resolution::File(root.join("ns/thing.py")));
}

// --- Relative imports ---

#[test]
fn single_dot_resolves_sibling() {
    let (_dir, root) = fixture();
    touch(&root.join("package/__init__.py"));
    touch(&root.join("package/module_b.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("module_b", 1, &root.join("package/module_a.py"));
    assert_eq!(got, Resolution::File(root.join("package/module_b.py")));
}

#[test]
fn double_dot_climbs_one_level() {
    let (_dir, root) = fixture();
    touch(&root.join("pkg/__init__.py"));
    touch(&root.join("pkg/helper.py"));
    touch(&root.join("pkg/sub/__init__.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("helper", 2, &root.join("pkg/sub/mod.py"));
    assert_eq!(got, Resolution::File(root.join("pkg/helper.py")));
}

#[test]
fn empty_relative_name_resolves_enclosing_package() {
    let (_dir, root) = fixture();
    touch(&root.join("pkg/__init__.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("", 1, &root.join("pkg/a.py"));
    assert_eq!(
        got,
        Resolution::RegularPackage {
            init_path: root.join("pkg/__init__.py"),
            dir: root.join("pkg"),
        }
    );
}

#[test]
fn relative_imports_ignore_search_roots() {
    let (_dir, root) = fixture();
    // A sibling named like a root-level module must win; the roots are
    // not consulted at all for level >= 1.
    touch(&root.join("target.py"));

    let resolver = resolver_for(&root, &[], false);
    let got = resolver.resolve("target", 1, &root.join("pkg/importer.py"));
    assert_eq!(got, Resolution::Unresolved);
}

// --- Stdlib policy ---

#[test]
fn stdlib_name_is_suppressed_when_excluded() {
    let (_dir, root) = fixture();
    touch(&root.join("os.py"));

    let resolver = resolver_for(&root, &["os"], false);
    assert!(resolver.is_suppressed_stdlib("os"));
    assert!(resolver.is_suppressed_stdlib("os.path"));
    assert_eq!(resolver.resolve("os", 0, &root.join("main.py")), Resolution::Unresolved);
}

#[test]
fn stdlib_name_resolves_when_included() {
    let (_dir, root) = fixture();
    touch(&root.join("os.py"));

    let resolver = resolver_for(&root, &["os"], true);
    assert!(!resolver.is_suppressed_stdlib("os"));
    assert_eq!(resolver.resolve("os", 0, &root.join("main.py")), Resolution::File(root.join("os.py")));
}

// --- Submodule probing ---

#[test]
fn probe_finds_child_module_and_subpackage() {
    let (_dir, root) = fixture();
    touch(&root.join("pkg/__init__.py"));
    touch(&root.join("pkg/child.py"));
    touch(&root.join("pkg/grandpkg/__init__.py"));

    let resolver = resolver_for(&root, &[], false);
    assert_eq!(resolver.probe(&root.join("pkg"), "child"), Resolution::File(root.join("pkg/child.py")));
    assert_eq!(
        resolver.probe(&root.join("pkg"), "grandpkg"),
        Resolution::RegularPackage {
            init_path: root.join("pkg/grandpkg/__init__.py"),
            dir: root.join("pkg/grandpkg"),
        }
    );
    assert_eq!(resolver.probe(&root.join("pkg"), "attr_only"), Resolution::Unresolved);
}
