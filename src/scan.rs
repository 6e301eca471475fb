use crate::audio;
use crate::classify::{self, BundleKind, FileKind};
use crate::error::ExtractError;
use crate::manifest::{FileRecord, PuzzleManifest};
use crate::picture;
use crate::progress::{ProgressConfig, ProgressHandle, ProgressReporter, ScanSummary};
use crate::text;
use crate::thumbnail;
use crate::util;

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Bundles processed concurrently.
    pub workers: usize,
    /// Where the collage goes; `None` disables thumbnails.
    pub thumbnail_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            thumbnail_dir: Some(PathBuf::from(".")),
        }
    }
}

impl ScanConfig {
    pub fn thumbnail_path(&self) -> Option<PathBuf> {
        self.thumbnail_dir
            .as_ref()
            .map(|d| d.join(util::THUMBNAIL_FILE_NAME))
    }
}

/// One directory of puzzle assets and its member file names.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub dir: PathBuf,
    /// Member names exactly as on disk.
    pub files: Vec<OsString>,
    pub bytes: u64,
}

impl Bundle {
    pub fn discover(dir: &Path) -> Result<Self> {
        let files = util::list_member_files(dir)?;
        let mut bytes = 0u64;
        for name in &files {
            let path = dir.join(name);
            let meta = std::fs::metadata(&path)
                .with_context(|| format!("stat {}", path.display()))?;
            bytes = bytes.saturating_add(meta.len());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            bytes,
        })
    }

    pub fn name(&self) -> String {
        util::folder_basename(&self.dir)
    }

    /// Member names as text, for extension rules. Not for building paths.
    pub fn member_names(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    pub fn member_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.dir.join(f)).collect()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(util::MANIFEST_FILE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    NotApplicable,
    Disabled,
    NoImages,
    Written(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BundleReport {
    pub dir: PathBuf,
    pub kind: BundleKind,
    pub file_count: usize,
    pub size: u64,
    pub manifest_path: PathBuf,
    pub thumbnail: ThumbnailOutcome,
}

#[derive(Debug)]
enum BundleOutcome {
    Written(BundleReport),
    Unclassified(PathBuf),
    Failed { dir: PathBuf, error: anyhow::Error },
}

/// Extract one member according to the bundle kind. In mixed bundles the
/// file's own extension picks the extractor.
pub fn extract_record(path: &Path, kind: BundleKind) -> Result<FileRecord, ExtractError> {
    let record = match kind {
        BundleKind::Text => FileRecord::Text(text::extract(path)?),
        BundleKind::Visual => FileRecord::Image(picture::extract(path)?),
        BundleKind::AudioVisual => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if FileKind::of(&name) == Some(FileKind::Audio) {
                FileRecord::Audio(audio::extract(path)?)
            } else {
                FileRecord::Image(picture::extract(path)?)
            }
        }
    };
    Ok(record)
}

/// Extract every member in order. The first failure aborts the bundle.
pub fn build_manifest(bundle: &Bundle, kind: BundleKind) -> Result<PuzzleManifest, ExtractError> {
    let mut manifest = PuzzleManifest::new(kind);
    for path in bundle.member_paths() {
        debug!(bundle = %bundle.dir.display(), file = %path.display(), %kind, "extracting");
        manifest.add(extract_record(&path, kind)?);
    }
    Ok(manifest)
}

/// Classify, extract and write `metadata.json` for one bundle, then compose
/// its thumbnail if it carries images. Nothing is written when any member
/// fails to extract. A thumbnail failure is reported in the returned
/// report, not as an error.
pub fn process_bundle(bundle: &Bundle, cfg: &ScanConfig) -> Result<BundleReport> {
    let kind = classify::classify(bundle.member_names()).ok_or_else(|| ExtractError::Unclassified {
        dir: bundle.dir.clone(),
    })?;

    let manifest = build_manifest(bundle, kind)
        .with_context(|| format!("bundle {}", bundle.dir.display()))?;

    // Records are complete; only now is the output file opened.
    let manifest_path = bundle.manifest_path();
    manifest
        .write_to(&manifest_path)
        .with_context(|| format!("bundle {}", bundle.dir.display()))?;

    let thumbnail = match (kind, cfg.thumbnail_path()) {
        (BundleKind::Text, _) => ThumbnailOutcome::NotApplicable,
        (_, None) => ThumbnailOutcome::Disabled,
        (_, Some(out)) => match thumbnail::compose(&bundle.member_paths(), &out) {
            Ok(Some(grid)) => {
                debug!(
                    bundle = %bundle.dir.display(),
                    tiles = grid.count,
                    rows = grid.rows,
                    columns = grid.columns,
                    "composed thumbnail"
                );
                ThumbnailOutcome::Written(out)
            }
            Ok(None) => ThumbnailOutcome::NoImages,
            Err(e) => ThumbnailOutcome::Failed(format!("{:#}", e)),
        },
    };

    Ok(BundleReport {
        dir: bundle.dir.clone(),
        kind,
        file_count: manifest.files_data.len(),
        size: manifest.size,
        manifest_path,
        thumbnail,
    })
}

fn run_bundle(bundle: &Bundle, cfg: &ScanConfig) -> BundleOutcome {
    match process_bundle(bundle, cfg) {
        Ok(report) => BundleOutcome::Written(report),
        Err(error) => {
            if let Some(ExtractError::Unclassified { dir }) = error.downcast_ref::<ExtractError>() {
                return BundleOutcome::Unclassified(dir.clone());
            }
            BundleOutcome::Failed {
                dir: bundle.dir.clone(),
                error,
            }
        }
    }
}

/// Process every immediate subdirectory of `root` as a bundle.
///
/// Only an unreadable root fails the scan; per-bundle failures are logged
/// and counted in the summary.
pub fn scan_root(root: &Path, cfg: &ScanConfig, progress_cfg: ProgressConfig) -> Result<ScanSummary> {
    let dirs = util::list_bundle_dirs(root)?;

    let mut bundles = Vec::with_capacity(dirs.len());
    let mut listing_failures = vec![];
    for dir in &dirs {
        match Bundle::discover(dir) {
            Ok(b) => bundles.push(b),
            Err(e) => listing_failures.push((dir.clone(), e)),
        }
    }
    let total_bytes: u64 = bundles.iter().map(|b| b.bytes).sum();
    let workers = cfg.workers.clamp(1, bundles.len().max(1));

    let reporter = ProgressReporter::new("scan", dirs.len(), total_bytes, progress_cfg);
    let progress = reporter.handle();
    progress.log(format!(
        "Scan plan: root={} bundles={} bytes={} workers={}",
        root.display(),
        dirs.len(),
        total_bytes,
        workers
    ));

    let mut summary = ScanSummary {
        root: root.to_path_buf(),
        bundle_count: dirs.len(),
        manifests_written: 0,
        unclassified: 0,
        failed: 0,
        thumbnails_written: 0,
        thumbnail_failures: 0,
        file_count: 0,
        total_bytes,
        processed_bytes: 0,
        workers,
        elapsed: Default::default(),
        avg_bytes_per_sec: 0.0,
        warning_count: 0,
        warnings: vec![],
    };

    for (dir, error) in listing_failures {
        tally(
            &mut summary,
            &progress,
            BundleOutcome::Failed { dir, error },
        );
        progress.complete_unit(0);
    }

    progress.set_stage("extract");
    run_pool(bundles, cfg, workers, &progress, &mut summary);

    let outcome = reporter.finish("scan complete");
    summary.elapsed = outcome.elapsed;
    summary.processed_bytes = outcome.processed_bytes;
    summary.avg_bytes_per_sec = outcome.avg_bytes_per_sec;
    summary.warning_count = outcome.warning_count;
    summary.warnings = outcome.warnings;
    Ok(summary)
}

fn run_pool(
    bundles: Vec<Bundle>,
    cfg: &ScanConfig,
    workers: usize,
    progress: &ProgressHandle,
    summary: &mut ScanSummary,
) {
    let bundles = Arc::new(bundles);
    let cfg = Arc::new(cfg.clone());
    let next_index = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = bounded::<(u64, BundleOutcome)>(workers * 2);

    let handles = (0..workers)
        .map(|worker_id| {
            let bundles = Arc::clone(&bundles);
            let cfg = Arc::clone(&cfg);
            let next_index = Arc::clone(&next_index);
            let progress = progress.clone();
            let tx = tx.clone();

            std::thread::spawn(move || {
                let op_id = format!("w{:02}", worker_id);
                loop {
                    let idx = next_index.fetch_add(1, Ordering::Relaxed);
                    let Some(bundle) = bundles.get(idx) else {
                        break;
                    };
                    progress.set_operation_status(
                        op_id.clone(),
                        format!("bundle={}/{} {}", idx + 1, bundles.len(), bundle.name()),
                    );
                    let outcome = run_bundle(bundle, &cfg);
                    if tx.send((bundle.bytes, outcome)).is_err() {
                        break;
                    }
                }
                progress.clear_operation(&op_id);
            })
        })
        .collect::<Vec<_>>();
    drop(tx);

    for (bytes, outcome) in rx {
        tally(summary, progress, outcome);
        progress.complete_unit(bytes);
    }

    for h in handles {
        if h.join().is_err() {
            summary.failed += 1;
            progress.warning("bundle worker thread panicked");
        }
    }
}

fn tally(summary: &mut ScanSummary, progress: &ProgressHandle, outcome: BundleOutcome) {
    match outcome {
        BundleOutcome::Written(report) => {
            summary.manifests_written += 1;
            summary.file_count += report.file_count;
            info!(
                bundle = %report.dir.display(),
                kind = %report.kind,
                files = report.file_count,
                size = report.size,
                "wrote {}",
                report.manifest_path.display()
            );
            match report.thumbnail {
                ThumbnailOutcome::Written(path) => {
                    summary.thumbnails_written += 1;
                    debug!(bundle = %report.dir.display(), "thumbnail {}", path.display());
                }
                ThumbnailOutcome::Failed(reason) => {
                    summary.thumbnail_failures += 1;
                    progress.warning(format!(
                        "thumbnail failed for bundle {}: {}",
                        report.dir.display(),
                        reason
                    ));
                }
                ThumbnailOutcome::NotApplicable
                | ThumbnailOutcome::Disabled
                | ThumbnailOutcome::NoImages => {}
            }
        }
        BundleOutcome::Unclassified(dir) => {
            summary.unclassified += 1;
            progress.warning(format!("skipped {}: invalid file types", dir.display()));
        }
        BundleOutcome::Failed { dir, error } => {
            summary.failed += 1;
            progress.warning(format!("failed {}: {:#}", dir.display(), error));
        }
    }
}
