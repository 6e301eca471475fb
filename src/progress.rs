use clap::ValueEnum;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_STORED_WARNINGS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ProgressMode {
    Auto,
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedProgressMode {
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub mode: ProgressMode,
    pub plain_interval: Duration,
    tty_override: Option<bool>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Auto,
            plain_interval: Duration::from_secs(2),
            tty_override: None,
        }
    }
}

impl ProgressConfig {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_tty_override(mut self, is_tty: bool) -> Self {
        self.tty_override = Some(is_tty);
        self
    }

    pub fn resolve_mode(self) -> ResolvedProgressMode {
        self.mode.resolve(
            self.tty_override
                .unwrap_or_else(|| std::io::stderr().is_terminal()),
        )
    }
}

impl ProgressMode {
    fn resolve(self, stderr_is_tty: bool) -> ResolvedProgressMode {
        match self {
            ProgressMode::Auto if stderr_is_tty => ResolvedProgressMode::Rich,
            ProgressMode::Auto => ResolvedProgressMode::Plain,
            ProgressMode::Rich => ResolvedProgressMode::Rich,
            ProgressMode::Plain => ResolvedProgressMode::Plain,
            ProgressMode::Quiet => ResolvedProgressMode::Quiet,
        }
    }
}

/// End-of-run tally printed by `main`.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub bundle_count: usize,
    pub manifests_written: usize,
    pub unclassified: usize,
    pub failed: usize,
    pub thumbnails_written: usize,
    pub thumbnail_failures: usize,
    pub file_count: usize,
    pub total_bytes: u64,
    pub processed_bytes: u64,
    pub workers: usize,
    pub elapsed: Duration,
    pub avg_bytes_per_sec: f64,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub elapsed: Duration,
    pub processed_bytes: u64,
    pub avg_bytes_per_sec: f64,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ProgressHandle {
    inner: Arc<ProgressInner>,
}

pub struct ProgressReporter {
    handle: ProgressHandle,
}

struct ProgressInner {
    label: String,
    mode: ResolvedProgressMode,
    plain_interval: Duration,
    state: Mutex<ProgressState>,
    rich: Option<RichUi>,
    finalized: AtomicBool,
}

struct RichUi {
    multi: MultiProgress,
    overall: ProgressBar,
    ops: Mutex<HashMap<String, ProgressBar>>,
}

#[derive(Debug)]
struct ProgressState {
    started: Instant,
    stage: String,
    total_bytes: u64,
    processed_bytes: u64,
    total_units: usize,
    done_units: usize,
    last_plain_emit: Option<Instant>,
    warnings: Vec<String>,
    warning_count: usize,
}

#[derive(Debug, Clone)]
struct Snapshot {
    stage: String,
    processed_bytes: u64,
    total_bytes: u64,
    done_units: usize,
    total_units: usize,
    elapsed: Duration,
    throughput_bps: f64,
    eta: Option<Duration>,
}

impl ProgressReporter {
    /// `total_units` is the number of bundles, `total_bytes` their combined size.
    pub fn new(
        label: impl Into<String>,
        total_units: usize,
        total_bytes: u64,
        config: ProgressConfig,
    ) -> Self {
        let label = label.into();
        let mode = config.resolve_mode();
        let rich = (mode == ResolvedProgressMode::Rich).then(|| RichUi::new(&label, total_bytes));

        let inner = Arc::new(ProgressInner {
            label,
            mode,
            plain_interval: config.plain_interval,
            state: Mutex::new(ProgressState {
                started: Instant::now(),
                stage: "starting".to_string(),
                total_bytes,
                processed_bytes: 0,
                total_units,
                done_units: 0,
                last_plain_emit: None,
                warnings: Vec::new(),
                warning_count: 0,
            }),
            rich,
            finalized: AtomicBool::new(false),
        });

        Self {
            handle: ProgressHandle { inner },
        }
    }

    pub fn handle(&self) -> ProgressHandle {
        self.handle.clone()
    }

    pub fn finish(self, final_message: impl Into<String>) -> ProgressOutcome {
        self.handle.inner.finalize(Some(final_message.into()))
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        let _ = self.handle.inner.finalize(None);
    }
}

impl ProgressHandle {
    pub fn set_stage(&self, stage: impl Into<String>) {
        let snapshot = {
            let mut state = self.inner.lock_state();
            state.stage = stage.into();
            snapshot_locked(&state)
        };
        self.inner.render(&snapshot, true);
    }

    /// One bundle finished, successfully or not, covering `bytes` of input.
    pub fn complete_unit(&self, bytes: u64) {
        let (snapshot, plain_due) = {
            let mut state = self.inner.lock_state();
            state.done_units += 1;
            state.processed_bytes = state.processed_bytes.saturating_add(bytes);
            if state.total_bytes > 0 {
                state.processed_bytes = state.processed_bytes.min(state.total_bytes);
            }
            let now = Instant::now();
            let due = state
                .last_plain_emit
                .map_or(true, |t| now.duration_since(t) >= self.inner.plain_interval)
                || state.done_units == state.total_units;
            if due {
                state.last_plain_emit = Some(now);
            }
            (snapshot_locked(&state), due)
        };
        self.inner.render(&snapshot, plain_due);
    }

    pub fn set_operation_status(&self, operation_id: impl Into<String>, status: impl Into<String>) {
        if let Some(rich) = &self.inner.rich {
            rich.set_operation(&operation_id.into(), &status.into());
        }
    }

    pub fn clear_operation(&self, operation_id: &str) {
        if let Some(rich) = &self.inner.rich {
            rich.clear_operation(operation_id);
        }
    }

    /// Record a warning for the summary and log it.
    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.inner.lock_state();
            state.warning_count += 1;
            if state.warnings.len() >= MAX_STORED_WARNINGS {
                state.warnings.remove(0);
            }
            state.warnings.push(message.clone());
        }
        self.inner
            .suspend(|| tracing::warn!(target: "puzzlemeta", "{}", message));
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        self.inner
            .suspend(|| tracing::info!(target: "puzzlemeta", "{}", message));
    }
}

impl ProgressInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        // A panicking worker must not take the reporter down with it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn suspend<F: FnOnce()>(&self, f: F) {
        match &self.rich {
            Some(rich) => rich.multi.suspend(f),
            None => f(),
        }
    }

    fn render(&self, snapshot: &Snapshot, plain_due: bool) {
        match self.mode {
            ResolvedProgressMode::Rich => self.render_rich(snapshot),
            ResolvedProgressMode::Plain if plain_due => self.render_plain(snapshot),
            _ => {}
        }
    }

    fn render_rich(&self, snapshot: &Snapshot) {
        let Some(rich) = &self.rich else {
            return;
        };
        rich.overall.set_length(snapshot.total_bytes.max(1));
        rich.overall
            .set_position(snapshot.processed_bytes.min(snapshot.total_bytes.max(1)));
        rich.overall.set_message(format!(
            "bundles={}/{} stage={} ETA={}",
            snapshot.done_units,
            snapshot.total_units,
            snapshot.stage,
            format_eta(snapshot.eta)
        ));
    }

    fn render_plain(&self, snapshot: &Snapshot) {
        eprintln!(
            "[PROGRESS] {} elapsed={} stage={} bundles={}/{} done={} / {} rate={} ETA={}",
            self.label,
            format_duration(snapshot.elapsed),
            snapshot.stage,
            snapshot.done_units,
            snapshot.total_units,
            HumanBytes(snapshot.processed_bytes),
            HumanBytes(snapshot.total_bytes),
            format_rate(snapshot.throughput_bps),
            format_eta(snapshot.eta),
        );
    }

    fn finalize(&self, final_message: Option<String>) -> ProgressOutcome {
        let (snapshot, warnings, warning_count) = {
            let state = self.lock_state();
            (
                snapshot_locked(&state),
                state.warnings.clone(),
                state.warning_count,
            )
        };

        if !self.finalized.swap(true, Ordering::Relaxed) {
            match self.mode {
                ResolvedProgressMode::Quiet => {}
                ResolvedProgressMode::Plain => {
                    if let Some(msg) = final_message.as_deref() {
                        eprintln!("[DONE] {}: {}", self.label, msg);
                    }
                }
                ResolvedProgressMode::Rich => {
                    if let Some(rich) = &self.rich {
                        rich.clear_all_ops();
                        rich.overall.finish_with_message(
                            final_message.unwrap_or_else(|| "interrupted".to_string()),
                        );
                    }
                }
            }
        }

        ProgressOutcome {
            elapsed: snapshot.elapsed,
            processed_bytes: snapshot.processed_bytes,
            avg_bytes_per_sec: average_rate(snapshot.processed_bytes, snapshot.elapsed),
            warning_count,
            warnings,
        }
    }
}

impl RichUi {
    fn new(label: &str, total_bytes: u64) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_bytes.max(1)));
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} | {msg}",
        ) {
            overall.set_style(style);
        }
        overall.set_message(format!("{} starting", label));

        Self {
            multi,
            overall,
            ops: Mutex::new(HashMap::new()),
        }
    }

    fn set_operation(&self, op_id: &str, status: &str) {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        let bar = ops.entry(op_id.to_string()).or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new_spinner());
            if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {prefix:.bold} {msg}") {
                pb.set_style(style.tick_chars("|/-\\ "));
            }
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_prefix(op_id.to_string());
            pb
        });
        bar.set_message(status.to_string());
    }

    fn clear_operation(&self, op_id: &str) {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = ops.remove(op_id) {
            bar.finish_and_clear();
        }
    }

    fn clear_all_ops(&self) {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        for (_id, bar) in ops.drain() {
            bar.finish_and_clear();
        }
    }
}

fn snapshot_locked(state: &ProgressState) -> Snapshot {
    let elapsed = state.started.elapsed();
    let throughput_bps = average_rate(state.processed_bytes, elapsed);
    Snapshot {
        stage: state.stage.clone(),
        processed_bytes: state.processed_bytes,
        total_bytes: state.total_bytes,
        done_units: state.done_units,
        total_units: state.total_units,
        elapsed,
        throughput_bps,
        eta: compute_eta(state.total_bytes, state.processed_bytes, throughput_bps),
    }
}

fn average_rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-6);
    bytes as f64 / secs
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

pub fn format_rate(bps: f64) -> String {
    if bps <= 0.1 {
        "0 B/s".to_string()
    } else {
        format!("{}/s", HumanBytes(bps as u64))
    }
}

fn format_eta(eta: Option<Duration>) -> String {
    eta.map(format_duration)
        .unwrap_or_else(|| "--:--".to_string())
}

fn compute_eta(total_bytes: u64, processed_bytes: u64, throughput_bps: f64) -> Option<Duration> {
    if throughput_bps <= 0.1 || processed_bytes >= total_bytes {
        return None;
    }
    let remaining = total_bytes.saturating_sub(processed_bytes) as f64;
    Some(Duration::from_secs_f64((remaining / throughput_bps).max(0.0)))
}
