use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use pytrace::{output, ParserChoice, TraceOptions};

#[derive(Parser)]
#[command(name = "pytrace", version)]
#[command(about = "Trace Python file dependencies: which files does your app need to run?")]
struct Cli {
    /// Entry point file(s) to trace
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Base directory for ignore matching and relative reporting
    #[arg(long)]
    base: Option<PathBuf>,

    /// Extra absolute-import search root (repeatable)
    #[arg(long = "extra-search-root", value_name = "DIR")]
    extra_search_roots: Vec<PathBuf>,

    /// Python runtime used for probing and structural parsing
    #[arg(long, value_name = "CMD")]
    python: Option<String>,

    /// Glob pattern to ignore (repeatable)
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Maximum traversal depth
    #[arg(long, default_value_t = 100)]
    max_depth: usize,

    /// Include standard-library files in the trace
    #[arg(long)]
    include_stdlib: bool,

    /// Drop site-packages from the search path
    #[arg(long)]
    no_site_packages: bool,

    /// Ignore dynamic-import idioms
    #[arg(long)]
    no_dynamic: bool,

    /// Upper bound on parallel file I/O
    #[arg(long, default_value_t = 1024)]
    concurrency: usize,

    /// Do not dereference symlinks
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Import extractor backend
    #[arg(long, value_enum, default_value_t = ParserArg::Auto)]
    parser: ParserArg,

    /// Output JSON mirroring the result shape
    #[arg(long)]
    json: bool,

    /// Report paths relative to the base directory
    #[arg(long)]
    relative: bool,

    /// Show why each file was included
    #[arg(long)]
    show_reasons: bool,

    /// Verbose progress on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ParserArg {
    /// Structural backend when the runtime works, regex otherwise
    Auto,
    /// Always attempt the structural backend
    Structural,
    /// Regex fallback only, no subprocesses
    Regex,
}

impl From<ParserArg> for ParserChoice {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Auto => Self::Auto,
            ParserArg::Structural => Self::Structural,
            ParserArg::Regex => Self::Regex,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut options = TraceOptions {
        base: cli.base.clone(),
        extra_search_roots: cli.extra_search_roots.clone(),
        ignore: cli.ignore.clone(),
        max_depth: cli.max_depth,
        include_stdlib: cli.include_stdlib,
        include_site_packages: !cli.no_site_packages,
        analyze_dynamic: !cli.no_dynamic,
        file_io_concurrency: cli.concurrency,
        follow_symlinks: !cli.no_follow_symlinks,
        parser: cli.parser.into(),
        ..TraceOptions::default()
    };
    if let Some(python) = &cli.python {
        options.runtime = Some(python.clone());
    }

    if cli.verbose {
        eprintln!("🔍 Tracing {} entry file(s)...", cli.files.len());
    }

    let result = pytrace::trace(&cli.files, &options)?;

    for warning in &result.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }

    if cli.json {
        println!("{}", output::render_json(&result, cli.relative)?);
    } else if cli.show_reasons {
        print!("{}", output::render_reasons(&result, cli.relative));
    } else {
        print!("{}", output::render_list(&result, cli.relative));
    }

    if cli.verbose {
        eprintln!(
            "✨ {} file(s), {} unresolved import(s)",
            result.files.len(),
            result.unresolved.len()
        );
    }

    Ok(())
}
