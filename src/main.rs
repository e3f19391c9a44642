//! filewarden - File integrity snapshots for a directory tree.
//!
//! Usage:
//!   fwd add    -d DB -p PATH   Record every file and directory under PATH
//!   fwd hash   -d DB -p PATH   Attach content digests to tracked files
//!   fwd verify -d DB -p PATH   Report drift without changing DB (alias: check)
//!   fwd update -d DB -p PATH   Rewrite drifted entries in DB
//!   fwd count  [-d DB] [-p PATH]
//!   fwd --help                 Show help

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use filewarden_audit::{
    AddSummary, CountReport, DriftKind, DriftReport, HashSummary, UpdateSummary, Verdict, add,
    count, hash, update, verify,
};
use filewarden_core::{Database, HashAlgorithm, WardenConfig};
use filewarden_scan::{Inventory, TreeWalker};

#[derive(Parser)]
#[command(
    name = "filewarden",
    version,
    about = "Record and verify the state of a directory tree",
    long_about = "filewarden records the type, ownership, permissions, size and content \
                  digest of files and directories in a JSON database, and later reports \
                  what changed.\n\n\
                  Build a database with `add` then `hash`, check it with `verify`, and \
                  accept legitimate changes with `update`."
)]
struct Cli {
    /// Action to run
    #[arg(value_enum)]
    action: Action,

    /// Database file (created on first write if missing)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// File or directory to operate on
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Worker threads for walking and hashing (0 = automatic)
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Digest algorithm for `hash` and for re-hashing
    #[arg(short, long, default_value = "sha256")]
    algorithm: HashAlgorithm,

    /// Do not fail `verify` because of untracked paths
    #[arg(long)]
    allow_untracked: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Count files and directories in the database and/or path
    Count,
    /// Record new files and directories
    Add,
    /// Compute digests for tracked files
    Hash,
    /// Same as `verify`
    Check,
    /// Compare the path against the database
    Verify,
    /// Rewrite changed entries and drop missing ones
    Update,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Count => "count",
            Action::Add => "add",
            Action::Hash => "hash",
            Action::Check => "check",
            Action::Verify => "verify",
            Action::Update => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    match run(&cli) {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => {
            eprintln!("there was a problem running action {}", cli.action.name());
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            eprintln!("there was a problem running action {}", cli.action.name());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides the flags.
fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Run the selected action. `Ok(false)` means the action ran but did not pass.
fn run(cli: &Cli) -> Result<bool> {
    if cli.action == Action::Count {
        if cli.database.is_none() && cli.path.is_none() {
            bail!("count needs --database, --path, or both");
        }
        return run_count(cli);
    }

    let (Some(db_path), Some(path)) = (&cli.database, &cli.path) else {
        bail!(
            "action {} needs both --database and --path",
            cli.action.name()
        );
    };

    let mut db = load_database(db_path)?;
    let config = build_config(cli, path)?;
    let inventory = scan(&config)?;

    match cli.action {
        Action::Add => {
            let summary = add(&mut db, &inventory).context("add failed")?;
            save_database(&db, db_path)?;
            render(cli.format, &summary, print_add)?;
            Ok(true)
        }
        Action::Hash => {
            let summary = hash(&mut db, &inventory, &config).context("hash failed")?;
            save_database(&db, db_path)?;
            render(cli.format, &summary, print_hash)?;
            Ok(true)
        }
        Action::Check | Action::Verify => {
            let verdict = verify(&db, &inventory, &config).context("verify failed")?;
            render(cli.format, &verdict, print_verdict)?;
            Ok(verdict.passed)
        }
        Action::Update => {
            let summary = update(&mut db, &inventory, &config).context("update failed")?;
            save_database(&db, db_path)?;
            render(cli.format, &summary, print_update)?;
            Ok(true)
        }
        Action::Count => run_count(cli),
    }
}

fn run_count(cli: &Cli) -> Result<bool> {
    let db = cli.database.as_deref().map(load_database).transpose()?;
    let inventory = match &cli.path {
        Some(path) => Some(scan(&build_config(cli, path)?)?),
        None => None,
    };

    let report = count(db.as_ref(), inventory.as_ref());
    render(cli.format, &report, print_count)?;
    Ok(true)
}

fn build_config(cli: &Cli, path: &Path) -> Result<WardenConfig> {
    WardenConfig::builder()
        .root(path)
        .threads(cli.threads)
        .algorithm(cli.algorithm)
        .untracked_is_drift(!cli.allow_untracked)
        .build()
        .context("Invalid configuration")
}

fn load_database(path: &Path) -> Result<Database> {
    let db = Database::load_or_default(path)
        .with_context(|| format!("Cannot load database {}", path.display()))?;
    debug!(path = %path.display(), entries = db.len(), "database loaded");
    Ok(db)
}

fn save_database(db: &Database, path: &Path) -> Result<()> {
    db.save(path)
        .with_context(|| format!("Cannot write database {}", path.display()))?;
    info!(path = %path.display(), entries = db.len(), "database saved");
    Ok(())
}

fn scan(config: &WardenConfig) -> Result<Inventory> {
    let inventory = TreeWalker::new()
        .walk(config)
        .with_context(|| format!("Cannot scan {}", config.root.display()))?;
    if inventory.skipped() > 0 {
        info!(
            skipped = inventory.skipped(),
            "symlinks and special files are not tracked"
        );
    }
    Ok(inventory)
}

/// Print a result as text or pretty JSON.
fn render<T: serde::Serialize>(format: OutputFormat, value: &T, text: fn(&T)) -> Result<()> {
    match format {
        OutputFormat::Text => text(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_count(report: &CountReport) {
    print!("{report}");
    if let Some(db) = &report.database {
        println!("database tracks {} of file content", format_size(db.bytes));
    }
}

fn print_add(summary: &AddSummary) {
    println!(
        "added {} files and {} directories",
        summary.files_added, summary.directories_added
    );
    println!(
        "database contains {} files and {} directories ({})",
        summary.totals.files,
        summary.totals.directories,
        format_size(summary.totals.bytes)
    );
}

fn print_hash(summary: &HashSummary) {
    println!(
        "hashed {} files ({} previously hashed)",
        summary.hashed, summary.rehashed
    );
    if summary.skipped > 0 {
        println!(
            "skipped {} files recorded as directories; run verify",
            summary.skipped
        );
    }
}

fn print_verdict(verdict: &Verdict) {
    print_drift(&verdict.report);
    if verdict.passed {
        println!("verify passed");
    } else {
        println!("verify failed: {} problems", verdict.failures);
    }
}

fn print_update(summary: &UpdateSummary) {
    print_drift(&summary.report);
    println!(
        "replaced {} entries ({} rehashed), removed {}, ignored {} untracked",
        summary.replaced, summary.rehashed, summary.removed, summary.untracked_ignored
    );
}

/// Drifted findings followed by per-category totals.
fn print_drift(report: &DriftReport) {
    for finding in report.drifted() {
        println!("{finding}");
    }
    for (kind, n) in report.tally() {
        if n > 0 || kind == DriftKind::Unchanged {
            println!("  {kind}: {n}");
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
