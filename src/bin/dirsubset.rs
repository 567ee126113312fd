//! # dirsubset CLI
//!
//! Checks that every file in directory A exists in directory B at the same
//! relative path with identical content.
//!
//! ## Usage
//! ```bash
//! # Compare two folders
//! dirsubset ~/Pictures /mnt/backup/Pictures
//!
//! # Prompt for both folders
//! dirsubset
//!
//! # Machine-readable output, 8 hashing workers
//! dirsubset --json --workers 8 src_dir dst_dir
//! ```
//!
//! ## Exit codes
//! - `0`: A is fully contained in B
//! - `1`: at least one file is missing or differs, or the run stopped early
//! - `2`: invalid input or another fatal error

use clap::{Parser, ValueEnum};
use colored::*;
use dirsubset::{
    report, validate_directory, AbortHandle, CasePolicy, ComparisonResult, Completion, DiffEntry,
    Result, VerifierBuilder, VerifyError,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Verify that directory A is a content-identical subset of directory B
#[derive(Parser)]
#[command(name = "dirsubset")]
#[command(version)]
#[command(about = "Check that every file in A exists in B with identical content")]
#[command(long_about = None)]
struct Cli {
    /// Directory whose files must all be present (prompted for if omitted)
    dir_a: Option<PathBuf>,

    /// Directory expected to contain them (prompted for if omitted)
    dir_b: Option<PathBuf>,

    /// Number of concurrent hashing workers (defaults to CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Glob pattern to leave out of both trees (repeatable)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// How letter case participates in path matching
    #[arg(long, value_enum, default_value = "auto")]
    case: CaseMode,

    /// Read size in bytes used when hashing
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Stop starting new checks after the first discrepancy
    #[arg(long)]
    fail_fast: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CaseMode {
    /// Fold case on Windows, preserve elsewhere
    Auto,
    /// Paths differing only in case are different files
    Preserve,
    /// Paths differing only in case are the same file
    Fold,
}

impl From<CaseMode> for CasePolicy {
    fn from(mode: CaseMode) -> Self {
        match mode {
            CaseMode::Auto => CasePolicy::platform_default(),
            CaseMode::Preserve => CasePolicy::Preserve,
            CaseMode::Fold => CasePolicy::Fold,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    // Disable colors if needed
    if cli.no_color || std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e.user_message());
            ExitCode::from(2)
        }
    }
}

/// Main command runner. Returns whether A is fully contained in B.
fn run(cli: Cli) -> Result<bool> {
    let dir_a = resolve_dir(cli.dir_a, "A path: ")?;
    let dir_b = resolve_dir(cli.dir_b, "B path: ")?;

    let mut builder = VerifierBuilder::new()
        .case_policy(cli.case.into())
        .exclude_patterns(cli.exclude);
    if let Some(workers) = cli.workers {
        builder = builder.parallel_workers(workers);
    }
    if let Some(chunk_size) = cli.chunk_size {
        builder = builder.chunk_size(chunk_size);
    }

    let progress = cli.progress.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    });

    let fail_fast = cli.fail_fast;
    if progress.is_some() || fail_fast {
        let pb = progress.clone();
        let abort = AbortHandle::new();
        let stop = abort.clone();
        builder = builder.abort_handle(abort).on_progress(move |p| {
            if let Some(pb) = &pb {
                pb.set_length(p.total as u64);
                pb.set_position(p.checked as u64);
                pb.set_message(dirsubset::format_bytes(p.bytes_hashed));
            }
            if fail_fast && p.discrepancies > 0 {
                stop.abort();
            }
        });
    }

    let verifier = builder.build()?;

    if !cli.json {
        println!(
            "{} {} {} {}",
            "Checking".blue().bold(),
            dir_a.display().to_string().cyan(),
            "against".blue().bold(),
            dir_b.display().to_string().cyan()
        );
    }

    let start = Instant::now();
    let result = verifier.verify(&dir_a, &dir_b);
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let result = result?;

    if cli.json {
        println!("{}", report::to_json(&result, &dir_a, &dir_b)?);
    } else {
        print_result(&result, start.elapsed());
    }

    Ok(result.all_matched)
}

/// Use the argument if given, otherwise ask on stdin until a directory is entered.
fn resolve_dir(arg: Option<PathBuf>, prompt: &str) -> Result<PathBuf> {
    match arg {
        Some(path) => {
            validate_directory(&path)?;
            Ok(path)
        }
        None => prompt_for_dir(prompt),
    }
}

fn prompt_for_dir(prompt: &str) -> Result<PathBuf> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", prompt);
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Err(VerifyError::configuration("no directory given on standard input"));
        };

        let input = clean_input(&line);
        if input.is_empty() {
            println!("{}", "Input cannot be empty, try again.".yellow());
            continue;
        }

        let path = expand_home(input);
        match validate_directory(&path) {
            Ok(()) => return Ok(path),
            Err(e) => println!("{}", e.user_message().yellow()),
        }
    }
}

/// Trim whitespace and one layer of surrounding quotes, as pasted paths often carry them
fn clean_input(line: &str) -> &str {
    let trimmed = line.trim();
    ['"', '\'']
        .iter()
        .find_map(|&q| trimmed.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
        .unwrap_or(trimmed)
        .trim()
}

fn expand_home(input: &str) -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match (input.strip_prefix('~'), home) {
        (Some(""), Some(home)) => PathBuf::from(home),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            PathBuf::from(home).join(&rest[1..])
        }
        _ => PathBuf::from(input),
    }
}

fn print_result(result: &ComparisonResult, elapsed: Duration) {
    let verdict = report::verdict_line(result);
    let verdict = match result.completion {
        Completion::Complete if result.all_matched => format!("✓ {}", verdict).green().bold(),
        Completion::Complete => format!("✗ {}", verdict).red().bold(),
        Completion::Incomplete { .. } => format!("⚠ {}", verdict).yellow().bold(),
    };
    println!("\n{}", verdict);

    for diff in &result.diagnostics {
        let line = format!("  - {}", diff);
        match diff {
            DiffEntry::Missing { .. } => println!("{}", line.red()),
            DiffEntry::SizeMismatch { .. } | DiffEntry::ContentMismatch { .. } => {
                println!("{}", line.yellow())
            }
            DiffEntry::Unreadable { .. } => println!("{}", line.magenta()),
        }
    }

    if !result.warnings.is_empty() {
        println!("\n{} {} warnings", "⚠".yellow().bold(), result.warnings.len());
        for warning in &result.warnings {
            println!("  {}", warning.to_string().yellow());
        }
    }

    println!(
        "\n  Files checked: {}  Hashed: {} ({})  Time: {}",
        result.stats.files_checked.to_string().cyan(),
        result.stats.files_hashed.to_string().cyan(),
        dirsubset::format_bytes(result.stats.bytes_hashed).cyan(),
        format_duration(Duration::from_millis(elapsed.as_millis() as u64))
            .to_string()
            .cyan()
    );
}
