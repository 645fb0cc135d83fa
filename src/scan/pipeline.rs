//! The scan pipeline: count, probe, classify, aggregate.
//!
//! A scan walks the configured roots twice. The first pass counts
//! regular files so progress has a denominator; the second pass stats,
//! probes, and classifies each file, folding the results into a
//! [`CategoryTree`] as it goes. Cancellation and pausing are honored
//! between directory entries, so the partial tree is always valid.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::aggregate::{Aggregator, CategoryTree};
use crate::anomaly::{detect_content_anomalies, detect_name_anomalies};
use crate::cache::ProbeCache;
use crate::classify::{classify_at, detect_category};
use crate::oplog::OperationLog;
use crate::probe::{hash_file, probe_file};
use crate::records::FileRecord;

use super::control::ScanControl;
use super::events::ScanEvents;

const PAUSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no scan roots configured")]
    NoRoots,
    #[error("scan root {} does not exist", .0.display())]
    MissingRoot(PathBuf),
    #[error("worker thread panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Counting,
    Scanning,
    Completed,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Counting => "counting",
            ScanState::Scanning => "scanning",
            ScanState::Completed => "completed",
            ScanState::Cancelled => "cancelled",
            ScanState::Failed => "failed",
        }
    }
}

/// What to scan and how. All knobs default off.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub roots: Vec<PathBuf>,
    pub include_hidden: bool,
    pub follow_links: bool,
    /// Directory depth limit relative to each root; `None` is unlimited.
    pub max_depth: Option<usize>,
    /// Hash every file during the scan instead of lazily on demand.
    pub compute_hashes: bool,
    pub cache_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// Clock used for age and date bucketing; defaults to the wall clock.
    pub now: Option<DateTime<Local>>,
}

impl ScanOptions {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            include_hidden: false,
            follow_links: false,
            max_depth: None,
            compute_hashes: false,
            cache_path: None,
            log_dir: None,
            now: None,
        }
    }

    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_hashes(mut self, compute_hashes: bool) -> Self {
        self.compute_hashes = compute_hashes;
        self
    }

    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Result of a finished (or cancelled) scan.
#[derive(Debug)]
pub struct ScanOutcome {
    pub state: ScanState,
    pub tree: CategoryTree,
    pub records: Vec<Arc<FileRecord>>,
    pub elapsed_secs: f64,
    pub log_path: Option<PathBuf>,
}

pub struct ScanPipeline {
    options: ScanOptions,
}

impl ScanPipeline {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Runs the scan on the current thread.
    pub fn run(
        &self,
        control: &ScanControl,
        events: &dyn ScanEvents,
    ) -> Result<ScanOutcome, JobError> {
        let started = Instant::now();
        let now = self.options.now.unwrap_or_else(Local::now);

        let job_id = Uuid::new_v4();
        let mut log = OperationLog::new("scan", self.options.log_dir.clone());
        log.append(format!(
            "scan start targets={} job={}",
            self.options.roots.len(),
            job_id
        ));

        if self.options.roots.is_empty() {
            return Err(fail_scan(log, JobError::NoRoots, events));
        }
        for root in &self.options.roots {
            if !root.exists() {
                return Err(fail_scan(log, JobError::MissingRoot(root.clone()), events));
            }
        }
        info!(%job_id, roots = self.options.roots.len(), "Starting scan");

        let cache = self.options.cache_path.clone().map(ProbeCache::load);

        let mut total = 0;
        'count: for root in &self.options.roots {
            for entry in self.walker(root) {
                if control.is_cancelled() {
                    break 'count;
                }
                wait_if_paused(control, events);
                let Ok(entry) = entry else { continue };
                if entry.file_type().is_file() {
                    total += 1;
                    events.on_count_progress(total, 0, entry.path());
                }
            }
        }

        let mut aggregator = Aggregator::new();
        let mut records: Vec<Arc<FileRecord>> = Vec::new();
        let mut attempted = 0;

        if !control.is_cancelled() {
            log.append(format!("discovered {} files", total));

            'scan: for root in &self.options.roots {
                for entry in self.walker(root) {
                    if control.is_cancelled() {
                        break 'scan;
                    }
                    wait_if_paused(control, events);

                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            let shown = e.path().unwrap_or(root.as_path());
                            log.append(format!("fail {}: {}", shown.display(), e));
                            debug!(path = %shown.display(), error = %e, "Walk error");
                            continue;
                        }
                    };
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    attempted += 1;
                    events.on_scan_progress(attempted, total, entry.path());

                    match self.analyze_file(&entry, cache.as_ref(), now) {
                        Ok((record, axes, from_cache)) => {
                            if from_cache {
                                log.append(format!("cache {}", record.path.display()));
                            } else {
                                log.append(format!("ok {}", record.path.display()));
                            }
                            aggregator.add(Arc::clone(&record), &axes);
                            records.push(record);
                        }
                        Err(e) => {
                            log.append(format!("fail {}: {}", entry.path().display(), e));
                        }
                    }
                }
            }
        }

        if let Some(cache) = &cache {
            if let Err(e) = cache.save() {
                warn!(error = %e, "Failed to save probe cache");
            }
        }

        let cancelled = control.is_cancelled();
        let elapsed_secs = started.elapsed().as_secs_f64();
        let state = if cancelled {
            ScanState::Cancelled
        } else {
            ScanState::Completed
        };
        let status = if cancelled {
            "cancelled"
        } else if total == 0 {
            "empty"
        } else {
            "completed"
        };

        let processed = records.len();
        let log_path = log.finalize(format!(
            "status={} total={} processed={} elapsed={:.2}s",
            status, total, processed, elapsed_secs
        ));

        let outcome = ScanOutcome {
            state,
            tree: aggregator.finish(),
            records,
            elapsed_secs,
            log_path,
        };

        info!(status, total, processed, elapsed_secs, "Scan finished");
        if cancelled {
            events.on_cancelled(&outcome);
        } else {
            events.on_completed(&outcome);
        }
        Ok(outcome)
    }

    /// Runs the scan on a worker thread and returns a handle for
    /// controlling and joining it.
    pub fn spawn(self, events: Arc<dyn ScanEvents>) -> ScanHandle {
        let control = Arc::new(ScanControl::new());
        let worker_control = Arc::clone(&control);
        let worker = thread::spawn(move || self.run(&worker_control, events.as_ref()));
        ScanHandle { control, worker }
    }

    fn walker(&self, root: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        let mut walk = WalkDir::new(root).follow_links(self.options.follow_links);
        if let Some(depth) = self.options.max_depth {
            walk = walk.max_depth(depth);
        }
        let include_hidden = self.options.include_hidden;
        // Depth 0 is the root itself; never filter it, even if its own
        // name starts with a dot.
        walk.into_iter()
            .filter_entry(move |entry| {
                include_hidden || entry.depth() == 0 || !is_hidden_name(entry.file_name())
            })
    }

    fn analyze_file(
        &self,
        entry: &walkdir::DirEntry,
        cache: Option<&ProbeCache>,
        now: DateTime<Local>,
    ) -> Result<(Arc<FileRecord>, BTreeMap<String, String>, bool), String> {
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|e| format!("Failed to stat {}: {}", path.display(), e))?;

        let category = detect_category(path);
        let mut record = FileRecord::from_metadata(path, &metadata, category);

        let report = probe_file(&record, cache);
        record.attributes.extend(report.attributes.clone());

        if self.options.compute_hashes {
            match hash_file(path) {
                Ok(digest) => record.content_hash = Some(digest),
                Err(e) => debug!(path = %path.display(), error = %e, "Hashing failed"),
            }
        }

        for reason in detect_name_anomalies(&record.name) {
            record.push_anomaly(reason);
        }
        for reason in detect_content_anomalies(&record, &report, self.options.compute_hashes) {
            record.push_anomaly(reason);
        }

        let axes = classify_at(&record, now);
        Ok((Arc::new(record), axes, report.from_cache))
    }
}

/// Handle to a scan running on a worker thread.
pub struct ScanHandle {
    control: Arc<ScanControl>,
    worker: JoinHandle<Result<ScanOutcome, JobError>>,
}

impl ScanHandle {
    pub fn control(&self) -> Arc<ScanControl> {
        Arc::clone(&self.control)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<ScanOutcome, JobError> {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => Err(JobError::WorkerPanicked),
        }
    }
}

/// Aborts a scan before any work happened: notifies observers, closes
/// the log with a failed status, and hands the error back verbatim.
fn fail_scan(mut log: OperationLog, err: JobError, events: &dyn ScanEvents) -> JobError {
    events.on_error(&err.to_string());
    log.append(format!("fail {}", err));
    log.finalize(format!("status={}", ScanState::Failed.as_str()));
    err
}

/// Blocks while the control is paused, emitting the pause/resume pair
/// exactly once per stretch. Cancellation breaks the wait without a
/// resume notification.
fn wait_if_paused(control: &ScanControl, events: &dyn ScanEvents) {
    if !control.is_paused() || control.is_cancelled() {
        return;
    }
    events.on_paused();
    while control.is_paused() && !control.is_cancelled() {
        thread::sleep(PAUSE_POLL);
    }
    if !control.is_cancelled() {
        events.on_resumed();
    }
}

fn is_hidden_name(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
