// src/trace/runner.rs
//! The fan-out traversal. Each file is one task on a dedicated thread
//! pool; the pool size is the concurrency gate, and one mutex around the
//! trace state is the only other synchronization.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::Scope;

use super::options::TraceOptions;
use crate::cache::TraceCache;
use crate::extract::Extractor;
use crate::paths;
use crate::pyenv::{self, PyEnv};
use crate::resolve::Resolver;
use crate::types::{DynamicKind, FileReason, ImportRecord, ReasonKind, Resolution, TraceResult};
use crate::vfs::{OsVfs, Vfs};

/// Past this point extra blocking-I/O threads stop paying for themselves;
/// `file_io_concurrency` above it only caps the logical fan-out.
const MAX_GATE_THREADS: usize = 64;

struct TraceState {
    reasons: BTreeMap<PathBuf, FileReason>,
    warnings: Vec<String>,
    unresolved: BTreeMap<String, BTreeSet<PathBuf>>,
    /// Files whose descent is in progress. Re-entering one is benign:
    /// parents accumulate, no re-descent.
    pending: HashSet<PathBuf>,
    /// Files whose imports are fully enumerated.
    traced: HashSet<PathBuf>,
}

struct Ctx {
    state: Mutex<TraceState>,
    cache: Arc<TraceCache>,
    vfs: Arc<dyn Vfs>,
    extractor: Extractor,
    resolver: Resolver,
    ignore: GlobSet,
    base: PathBuf,
    max_depth: usize,
    analyze_dynamic: bool,
    follow_symlinks: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl Ctx {
    fn lock(&self) -> MutexGuard<'_, TraceState> {
        self.state.lock().expect("trace state lock")
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        if self.ignore.is_match(path) {
            return true;
        }
        if let Ok(rel) = path.strip_prefix(&self.base) {
            if self.ignore.is_match(rel) {
                return true;
            }
        }
        path.file_name().is_some_and(|name| self.ignore.is_match(Path::new(name)))
    }
}

/// Traces the closure of `entries`.
///
/// # Errors
/// Fails on an empty entry set, a missing entry file, or an invalid
/// ignore pattern. Per-file trouble is recovered into warnings.
pub fn run(entries: &[PathBuf], options: &TraceOptions) -> Result<TraceResult> {
    if entries.is_empty() {
        bail!("no entry files given");
    }
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let vfs: Arc<dyn Vfs> = options
        .vfs
        .clone()
        .unwrap_or_else(|| Arc::new(OsVfs::new(options.follow_symlinks)));

    let base_opt = options.base.clone().unwrap_or_else(|| cwd.clone());
    let base = paths::normalize(&base_opt, &cwd, options.follow_symlinks);

    let mut entry_paths = Vec::new();
    for entry in entries {
        let path = paths::normalize(entry, &cwd, options.follow_symlinks);
        if !vfs.is_file(&path) {
            bail!("entry file not found: {}", path.display());
        }
        entry_paths.push(path);
    }

    let ignore = build_ignore_set(&options.ignore)?;

    let cache = options.cache.clone().unwrap_or_default();
    let env: PyEnv = cache
        .env_or_probe(|| match &options.runtime {
            Some(runtime) => pyenv::probe(runtime, options.helper_timeout),
            None => PyEnv::offline(),
        })
        .clone();

    let roots = build_search_roots(&base, options, &env, &cwd, vfs.as_ref());
    let extractor = Extractor::new(
        options.parser,
        options.runtime.as_deref(),
        env.version.is_some(),
        options.helper_timeout,
    );
    let resolver = Resolver::new(
        Arc::clone(&vfs),
        Arc::clone(&cache),
        roots,
        env.stdlib_modules.clone(),
        options.include_stdlib,
    );

    let ctx = Ctx {
        state: Mutex::new(TraceState {
            reasons: BTreeMap::new(),
            warnings: env.warnings.clone(),
            unresolved: BTreeMap::new(),
            pending: HashSet::new(),
            traced: HashSet::new(),
        }),
        cache,
        vfs,
        extractor,
        resolver,
        ignore,
        base: base.clone(),
        max_depth: options.max_depth,
        analyze_dynamic: options.analyze_dynamic,
        follow_symlinks: options.follow_symlinks,
        cancel: options.cancel.clone(),
    };

    {
        let mut st = ctx.lock();
        for path in &entry_paths {
            // Entries go through the same ignore policy as everything
            // else; an ignored entry is recorded but never descended.
            let ignored = ctx.is_ignored(path);
            st.reasons.entry(path.clone()).or_insert_with(|| {
                let mut reason = FileReason::new(ReasonKind::Entry, None);
                reason.ignored = ignored;
                reason
            });
        }
    }

    let threads = options.file_io_concurrency.clamp(1, MAX_GATE_THREADS);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build trace thread pool")?;

    pool.scope(|scope| {
        for path in entry_paths {
            let ctx = &ctx;
            scope.spawn(move |scope| process_file(scope, ctx, path, 0));
        }
    });

    let state = ctx.state.into_inner().expect("trace state lock");
    let files = state
        .reasons
        .iter()
        .filter(|(_, reason)| !reason.ignored)
        .map(|(path, _)| path.clone())
        .collect();
    Ok(TraceResult {
        files,
        reasons: state.reasons,
        warnings: state.warnings,
        unresolved: state.unresolved,
        base,
    })
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid ignore pattern {pattern:?}"))?);
    }
    builder.build().context("failed to compile ignore patterns")
}

/// Search roots per the resolution order: base, base/src when present,
/// extra roots, site roots, stdlib root. The importing file's directory is
/// always consulted first by the resolver itself.
fn build_search_roots(
    base: &Path,
    options: &TraceOptions,
    env: &PyEnv,
    cwd: &Path,
    vfs: &dyn Vfs,
) -> Vec<PathBuf> {
    let mut roots = vec![base.to_path_buf()];
    let src_dir = base.join("src");
    if vfs.is_dir(&src_dir) {
        roots.push(src_dir);
    }
    for extra in &options.extra_search_roots {
        roots.push(paths::normalize(extra, cwd, options.follow_symlinks));
    }
    if options.include_site_packages {
        roots.extend(env.site_roots.iter().cloned());
    }
    if options.include_stdlib {
        if let Some(stdlib) = &env.stdlib_root {
            roots.push(stdlib.clone());
        }
    }
    roots
}

fn process_file<'s>(scope: &Scope<'s>, ctx: &'s Ctx, path: PathBuf, depth: usize) {
    if ctx.cancelled() {
        return;
    }
    {
        let mut st = ctx.lock();
        if st.traced.contains(&path) || st.pending.contains(&path) {
            return;
        }
        if depth > ctx.max_depth {
            st.warnings
                .push(format!("max depth ({}) exceeded at {}", ctx.max_depth, path.display()));
            return;
        }
        if st.reasons.get(&path).is_some_and(|r| r.ignored) {
            st.traced.insert(path.clone());
            return;
        }
        st.pending.insert(path.clone());
    }

    // Only target-language files are parsed; anything else (run_path
    // targets without the extension, data files) is a leaf.
    if path.extension().map_or(true, |ext| ext != "py") {
        finish(ctx, &path);
        return;
    }

    let content = match read_content(ctx, &path) {
        Ok(text) => text,
        Err(e) => {
            ctx.lock().warnings.push(format!("failed to read {}: {e}", path.display()));
            finish(ctx, &path);
            return;
        }
    };

    let records = match ctx.cache.imports(&path) {
        Some(cached) => cached,
        None => {
            let (records, warnings) = ctx.extractor.extract(&path, &content);
            if !warnings.is_empty() {
                ctx.lock().warnings.extend(warnings);
            }
            ctx.cache.store_imports(&path, records)
        }
    };

    for record in records.iter() {
        process_import(scope, ctx, record, &path, depth);
    }
    finish(ctx, &path);
}

fn finish(ctx: &Ctx, path: &Path) {
    let mut st = ctx.lock();
    st.pending.remove(path);
    st.traced.insert(path.to_path_buf());
}

fn read_content(ctx: &Ctx, path: &Path) -> std::io::Result<Arc<str>> {
    if let Some(cached) = ctx.cache.content(path) {
        return Ok(cached);
    }
    let text = ctx.vfs.read_to_string(path)?;
    Ok(ctx.cache.store_content(path, &text))
}

fn process_import<'s>(
    scope: &Scope<'s>,
    ctx: &'s Ctx,
    record: &ImportRecord,
    importer: &Path,
    depth: usize,
) {
    match record {
        ImportRecord::Plain { module, .. } => {
            resolve_and_include(scope, ctx, module, 0, importer, depth, ReasonKind::PlainImport);
        }
        ImportRecord::From { base, level, names, .. } => {
            let kind = if *level >= 1 { ReasonKind::RelativeImport } else { ReasonKind::FromImport };
            if *level >= 1 {
                warn_if_outside_package(ctx, importer);
            }
            let resolution = ctx.resolver.resolve(base, *level, importer);
            if resolution == Resolution::Unresolved {
                note_unresolved(ctx, base, *level, importer);
                return;
            }
            include(scope, ctx, &resolution, kind, dotted(base, *level), importer, depth);

            // Submodule promotion: each imported name may be a child
            // module of the resolved package rather than an attribute.
            if let Some(pkg_dir) = package_dir(&resolution) {
                for name in names.iter().filter(|n| !n.is_wildcard()) {
                    let probe = ctx.resolver.probe(&pkg_dir, &name.name);
                    if probe == Resolution::Unresolved {
                        continue; // ordinary attribute, not a submodule
                    }
                    let full = if base.is_empty() {
                        dotted(&name.name, *level)
                    } else {
                        dotted(&format!("{base}.{}", name.name), *level)
                    };
                    include(scope, ctx, &probe, ReasonKind::FromImport, full, importer, depth);
                }
            }
        }
        ImportRecord::Dynamic { .. } if !ctx.analyze_dynamic => {}
        ImportRecord::Dynamic { kind, module, level, path, expression, line, .. } => {
            process_dynamic(scope, ctx, *kind, module.as_deref(), *level, path.as_deref(),
                expression.as_deref(), *line, importer, depth);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_dynamic<'s>(
    scope: &Scope<'s>,
    ctx: &'s Ctx,
    kind: DynamicKind,
    module: Option<&str>,
    level: usize,
    path: Option<&str>,
    expression: Option<&str>,
    line: usize,
    importer: &Path,
    depth: usize,
) {
    if kind == DynamicKind::RunpyRunPath {
        match path {
            Some(literal) => {
                let importing_dir = importer.parent().unwrap_or_else(|| Path::new("/"));
                let target =
                    paths::normalize(Path::new(literal), importing_dir, ctx.follow_symlinks);
                if ctx.vfs.is_file(&target) {
                    record(ctx, &target, ReasonKind::DynamicImport, Some(literal.to_string()),
                        importer, false);
                    enqueue(scope, ctx, target, depth + 1);
                } else {
                    ctx.lock()
                        .unresolved
                        .entry(literal.to_string())
                        .or_default()
                        .insert(importer.to_path_buf());
                }
            }
            None => warn_non_literal(ctx, expression, line, importer),
        }
        return;
    }

    match module {
        Some(name) => {
            resolve_and_include(scope, ctx, name, level, importer, depth, ReasonKind::DynamicImport);
        }
        None => warn_non_literal(ctx, expression, line, importer),
    }
}

fn warn_non_literal(ctx: &Ctx, expression: Option<&str>, line: usize, importer: &Path) {
    let snippet = expression.unwrap_or("<unknown>");
    ctx.lock().warnings.push(format!(
        "dynamic import at {}:{line} has non-literal argument '{snippet}'; not traced",
        importer.display()
    ));
}

fn resolve_and_include<'s>(
    scope: &Scope<'s>,
    ctx: &'s Ctx,
    module: &str,
    level: usize,
    importer: &Path,
    depth: usize,
    kind: ReasonKind,
) {
    let resolution = ctx.resolver.resolve(module, level, importer);
    if resolution == Resolution::Unresolved {
        note_unresolved(ctx, module, level, importer);
        return;
    }
    include(scope, ctx, &resolution, kind, dotted(module, level), importer, depth);
}

fn note_unresolved(ctx: &Ctx, module: &str, level: usize, importer: &Path) {
    if level == 0 && ctx.resolver.is_suppressed_stdlib(module) {
        return; // suppressed, not a gap
    }
    let name = dotted(module, level).unwrap_or_else(|| module.to_string());
    ctx.lock().unresolved.entry(name).or_default().insert(importer.to_path_buf());
}

/// Renders a possibly-relative module name with its leading dots.
fn dotted(module: &str, level: usize) -> Option<String> {
    if module.is_empty() && level == 0 {
        return None;
    }
    Some(format!("{}{module}", ".".repeat(level)))
}

fn package_dir(resolution: &Resolution) -> Option<PathBuf> {
    match resolution {
        Resolution::RegularPackage { dir, .. } | Resolution::NamespacePackage { dir } => {
            Some(dir.clone())
        }
        _ => None,
    }
}

fn include<'s>(
    scope: &Scope<'s>,
    ctx: &'s Ctx,
    resolution: &Resolution,
    kind: ReasonKind,
    module_name: Option<String>,
    importer: &Path,
    depth: usize,
) {
    match resolution {
        Resolution::File(file) => {
            record(ctx, file, kind, module_name, importer, false);
            enqueue(scope, ctx, file.clone(), depth + 1);
        }
        Resolution::RegularPackage { init_path, .. } => {
            record(ctx, init_path, kind, module_name, importer, true);
            enqueue(scope, ctx, init_path.clone(), depth + 1);
        }
        // Namespace packages mark the directory's existence; their
        // contents are never enumerated.
        Resolution::NamespacePackage { dir } => {
            record(ctx, dir, ReasonKind::NamespaceMarker, module_name, importer, false);
        }
        Resolution::Unresolved => {}
    }
}

fn record(
    ctx: &Ctx,
    path: &Path,
    kind: ReasonKind,
    module_name: Option<String>,
    parent: &Path,
    package_init: bool,
) {
    let ignored = ctx.is_ignored(path);
    let mut st = ctx.lock();
    let reason = st.reasons.entry(path.to_path_buf()).or_insert_with(|| {
        let mut r = FileReason::new(kind, module_name);
        r.ignored = ignored;
        r.package_init = package_init;
        r
    });
    reason.add_parent(parent);
}

fn enqueue<'s>(scope: &Scope<'s>, ctx: &'s Ctx, path: PathBuf, depth: usize) {
    scope.spawn(move |scope| process_file(scope, ctx, path, depth));
}

fn warn_if_outside_package(ctx: &Ctx, importer: &Path) {
    let Some(dir) = importer.parent() else { return };
    if !ctx.vfs.is_file(&dir.join("__init__.py")) {
        ctx.lock().warnings.push(format!(
            "relative import in {} but {} is not a package",
            importer.display(),
            dir.display()
        ));
    }
}
