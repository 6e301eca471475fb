mod audio;
mod checksum;
mod classify;
mod error;
mod manifest;
mod picture;
mod progress;
mod scan;
mod text;
mod thumbnail;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use progress::{ProgressConfig, ProgressMode, ScanSummary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "puzzlemeta",
    version,
    about = "Classify puzzle asset bundles and write a metadata.json manifest (plus a thumbnail collage) for each"
)]
struct Cli {
    /// Directory whose immediate subdirectories are the bundles
    root: PathBuf,

    /// Bundles processed concurrently. Default: number of CPUs.
    #[arg(long)]
    workers: Option<usize>,

    /// Directory the t-100.jpg collage is written to
    #[arg(long, default_value = ".")]
    thumbnail_dir: PathBuf,

    /// Skip thumbnail composition
    #[arg(long, default_value_t = false)]
    no_thumbnail: bool,

    /// Progress display mode: auto (TTY-aware), rich, plain, quiet.
    #[arg(long, value_enum, default_value_t = ProgressMode::Auto)]
    progress: ProgressMode,

    /// Log per-file extraction (overridden by RUST_LOG)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let defaults = scan::ScanConfig::default();
    let cfg = scan::ScanConfig {
        workers: cli.workers.map(|w| w.max(1)).unwrap_or(defaults.workers),
        thumbnail_dir: (!cli.no_thumbnail).then_some(cli.thumbnail_dir),
    };

    let summary = scan::scan_root(&cli.root, &cfg, ProgressConfig::new(cli.progress))
        .with_context(|| format!("cannot scan {}", cli.root.display()))?;
    print_scan_summary(&summary);
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

fn print_scan_summary(summary: &ScanSummary) {
    println!(
        "Scan summary: root={} duration={} throughput={} bytes={} / {} bundles={} manifests={} unclassified={} failed={} files={} thumbnails={} thumbnail_failures={} workers={} warnings={}",
        summary.root.display(),
        progress::format_duration(summary.elapsed),
        progress::format_rate(summary.avg_bytes_per_sec),
        HumanBytes(summary.processed_bytes),
        HumanBytes(summary.total_bytes),
        summary.bundle_count,
        summary.manifests_written,
        summary.unclassified,
        summary.failed,
        summary.file_count,
        summary.thumbnails_written,
        summary.thumbnail_failures,
        summary.workers,
        summary.warning_count,
    );
    for warning in &summary.warnings {
        println!("  warning: {}", warning);
    }
}
