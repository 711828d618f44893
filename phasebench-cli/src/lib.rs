//! PhaseBench CLI Library
//!
//! CLI infrastructure for benchmark binaries. Register benchmarks into a
//! [`Registry`] and hand it to [`run`] from your main function to get
//! filtering, progress display and report output selection.
//!
//! # Example
//!
//! ```ignore
//! use phasebench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.add(BenchmarkInstance::sequential(
//!         "sort",
//!         Settings::new().with_operations(1000),
//!         SortBench::default(),
//!     ));
//!     phasebench_cli::run(registry)
//! }
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use phasebench_core::{LaunchHandler, Registry};
use phasebench_report::{ConsoleReporter, CsvReporter, JsonReporter, OutputFormat};
use regex::Regex;

/// PhaseBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "phasebench")]
#[command(author, version, about = "PhaseBench - phase-based benchmarking harness")]
pub struct Cli {
    /// Filter benchmarks by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: console, csv, json
    #[arg(long, default_value = "console")]
    pub format: String,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// List matching benchmarks without executing
    #[arg(long)]
    pub list: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// Run the PhaseBench CLI against the given registry.
/// This is the main entry point for benchmark binaries.
pub fn run(registry: Registry) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, registry)
}

/// Run the PhaseBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli, mut registry: Registry) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("phasebench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("phasebench=info")
            .init();
    }

    let filter =
        Regex::new(&cli.filter).with_context(|| format!("invalid filter: {}", cli.filter))?;
    let format: OutputFormat = cli
        .format
        .parse()
        .map_err(|message: String| anyhow::anyhow!(message))?;

    if cli.list {
        return list_benchmarks(&registry, &filter);
    }

    tracing::debug!(filter = %cli.filter, format = %cli.format, "launching benchmarks");
    let mut progress = ProgressHandler::default();
    registry.launch_filtered(|name| filter.is_match(name), &mut progress);
    progress.finish();

    let text = match format {
        OutputFormat::Console => {
            let mut reporter = ConsoleReporter::new();
            registry.report(&mut reporter);
            reporter.into_output()
        }
        OutputFormat::Csv => {
            let mut reporter = CsvReporter::new();
            registry.report(&mut reporter);
            reporter.into_output()
        }
        OutputFormat::Json => {
            let mut reporter = JsonReporter::new();
            registry.report(&mut reporter);
            reporter.into_output()
        }
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("cannot write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn list_benchmarks(registry: &Registry, filter: &Regex) -> anyhow::Result<()> {
    let mut total = 0;
    for benchmark in registry.benchmarks() {
        if !filter.is_match(benchmark.name()) {
            continue;
        }
        println!(
            "├── {} ({} launches)",
            benchmark.name(),
            benchmark.count_launches()
        );
        total += 1;
    }
    println!("{} benchmarks found.", total);
    Ok(())
}

/// Progress bar over every launched combination; lazily created on the
/// first notification so `--list` and empty filters never draw one.
#[derive(Default)]
struct ProgressHandler {
    bar: Option<ProgressBar>,
}

impl ProgressHandler {
    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl LaunchHandler for ProgressHandler {
    fn on_launching(
        &mut self,
        _current: usize,
        total: usize,
        benchmark: &str,
        description: &str,
        attempt: usize,
    ) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        });
        bar.set_message(format!("{benchmark}{description} attempt {attempt}"));
    }

    fn on_launched(
        &mut self,
        current: usize,
        _total: usize,
        _benchmark: &str,
        _description: &str,
        _attempt: usize,
    ) {
        if let Some(bar) = &self.bar {
            bar.set_position(current as u64);
        }
    }
}
