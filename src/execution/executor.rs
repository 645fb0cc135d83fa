//! Batch file operations: copy, move, or link files into resolved
//! destination folders.
//!
//! A batch runs on the calling thread, honors the shared pause/cancel
//! control between files, and never aborts on a per-file failure. Dry
//! runs resolve and validate everything but leave the filesystem
//! untouched, collecting preview rows instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::oplog::OperationLog;
use crate::paths::allocate_unique_path;
use crate::records::FileRecord;
use crate::scan::ScanControl;

use super::resolver::DestinationResolver;

const PAUSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    Copy,
    Move,
    Link,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Copy => "copy",
            OperationMode::Move => "move",
            OperationMode::Link => "link",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_root: PathBuf,
    pub dry_run: bool,
    pub log_dir: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(output_root: PathBuf) -> Self {
        Self {
            output_root,
            dry_run: false,
            log_dir: None,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }
}

/// One planned placement, collected during dry runs.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub source: PathBuf,
    pub target: PathBuf,
    pub folder: PathBuf,
    pub rule: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub preview: Vec<PreviewRow>,
    pub errors: Vec<String>,
    pub log_path: Option<PathBuf>,
}

/// Observer for batch progress; every method has a no-op default.
pub trait BatchEvents: Send + Sync {
    /// Fired once per file before it is handled.
    fn on_progress(&self, _done: usize, _total: usize, _path: &Path) {}

    fn on_paused(&self) {}

    fn on_resumed(&self) {}

    fn on_completed(&self, _report: &BatchReport) {}

    fn on_cancelled(&self, _report: &BatchReport) {}
}

pub struct NullBatchEvents;

impl BatchEvents for NullBatchEvents {}

/// Applies `mode` to every file, resolving destinations through
/// `resolver` and allocating collision-free names under the output
/// root. Per-file failures are counted and logged; only cancellation
/// stops the batch early.
pub fn execute_batch(
    files: &[Arc<FileRecord>],
    resolver: &dyn DestinationResolver,
    mode: OperationMode,
    options: &BatchOptions,
    events: &dyn BatchEvents,
    control: &ScanControl,
) -> BatchReport {
    let started = Instant::now();
    let total = files.len();

    let job_id = Uuid::new_v4();
    let mut log = OperationLog::new("batch", options.log_dir.clone());
    log.append(format!(
        "processing start mode={} targets={} dry_run={} job={}",
        mode.as_str(),
        total,
        options.dry_run,
        job_id
    ));
    info!(
        %job_id,
        mode = mode.as_str(),
        targets = total,
        dry_run = options.dry_run,
        "Starting batch"
    );

    let mut report = BatchReport::default();
    let mut processed = 0;

    for (index, record) in files.iter().enumerate() {
        if control.is_cancelled() {
            break;
        }
        wait_if_paused(control, events);

        events.on_progress(index + 1, total, &record.path);

        match handle_file(record, resolver, mode, options, &mut report) {
            Ok(target) => {
                report.success_count += 1;
                log.append(format!("ok {} -> {}", record.path.display(), target.display()));
            }
            Err(Outcome::Skipped(reason)) => {
                report.skipped_count += 1;
                log.append(format!("skip {}: {}", record.path.display(), reason));
                debug!(path = %record.path.display(), reason = %reason, "Skipped");
            }
            Err(Outcome::Failed(err)) => {
                report.error_count += 1;
                log.append(format!("fail {}: {}", record.path.display(), err));
                report.errors.push(err);
            }
        }
        processed = index + 1;
    }

    let cancelled = control.is_cancelled();
    let elapsed = started.elapsed().as_secs_f64();
    let status = if cancelled {
        "cancelled"
    } else if total == 0 {
        "empty"
    } else {
        "completed"
    };

    report.log_path = log.finalize(format!(
        "status={} mode={} dry_run={} processed={} total={} elapsed={:.2}s",
        status,
        mode.as_str(),
        options.dry_run,
        processed,
        total,
        elapsed
    ));

    info!(
        status,
        success = report.success_count,
        errors = report.error_count,
        skipped = report.skipped_count,
        "Batch finished"
    );
    if cancelled {
        events.on_cancelled(&report);
    } else {
        events.on_completed(&report);
    }
    report
}

enum Outcome {
    Skipped(String),
    Failed(String),
}

fn handle_file(
    record: &FileRecord,
    resolver: &dyn DestinationResolver,
    mode: OperationMode,
    options: &BatchOptions,
    report: &mut BatchReport,
) -> Result<PathBuf, Outcome> {
    let source = record.path.as_path();
    if !source.is_file() {
        return Err(Outcome::Failed(format!(
            "Source not found: {}",
            source.display()
        )));
    }

    let resolution = resolver.resolve(record).map_err(Outcome::Failed)?;
    let dest_dir = options.output_root.join(&resolution.folder);
    let plain_target = dest_dir.join(&record.name);

    if plain_target == record.path {
        return Err(Outcome::Skipped("already at destination".to_string()));
    }

    if options.dry_run {
        report.preview.push(PreviewRow {
            source: record.path.clone(),
            target: plain_target.clone(),
            folder: resolution.folder,
            rule: resolution.rule,
        });
        return Ok(plain_target);
    }

    let target = allocate_unique_path(&dest_dir, &record.name).map_err(Outcome::Failed)?;
    match mode {
        OperationMode::Copy => copy_file(source, &target).map_err(Outcome::Failed)?,
        OperationMode::Move => move_file(source, &target).map_err(Outcome::Failed)?,
        OperationMode::Link => link_file(source, &target).map_err(Outcome::Failed)?,
    }
    Ok(target)
}

/// Copy with partial-destination cleanup: a failed copy never leaves a
/// truncated file behind.
fn copy_file(source: &Path, target: &Path) -> Result<(), String> {
    if let Err(e) = fs::copy(source, target) {
        if target.exists() {
            let _ = fs::remove_file(target);
        }
        return Err(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            target.display(),
            e
        ));
    }
    Ok(())
}

/// Rename first; across filesystems fall back to copy-then-delete. The
/// source is removed only once the destination write completed.
pub(crate) fn move_file(source: &Path, target: &Path) -> Result<(), String> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    copy_file(source, target)?;
    fs::remove_file(source)
        .map_err(|e| format!("Failed to remove source {}: {}", source.display(), e))
}

#[cfg(unix)]
fn link_file(source: &Path, target: &Path) -> Result<(), String> {
    std::os::unix::fs::symlink(source, target).map_err(|e| {
        format!(
            "Failed to link {} to {}: {}",
            source.display(),
            target.display(),
            e
        )
    })
}

#[cfg(windows)]
fn link_file(source: &Path, target: &Path) -> Result<(), String> {
    std::os::windows::fs::symlink_file(source, target).map_err(|e| {
        format!(
            "Failed to link {} to {}: {}",
            source.display(),
            target.display(),
            e
        )
    })
}

fn wait_if_paused(control: &ScanControl, events: &dyn BatchEvents) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::detect_category;
    use crate::execution::resolver::CategoryFolders;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Counter {
        progress: AtomicUsize,
        completed: AtomicUsize,
        cancelled: AtomicUsize,
    }

    impl BatchEvents for Counter {
        fn on_progress(&self, _done: usize, _total: usize, _path: &Path) {
            self.progress.fetch_add(1, Ordering::SeqCst);
        }

        fn on_completed(&self, _report: &BatchReport) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_cancelled(&self, _report: &BatchReport) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record_for(path: &Path) -> Arc<FileRecord> {
        Arc::new(FileRecord::from_path(path, detect_category(path)).unwrap())
    }

    fn sample_batch(dir: &TempDir) -> Vec<Arc<FileRecord>> {
        let track = dir.path().join("track.mp3");
        let notes = dir.path().join("notes.txt");
        fs::write(&track, b"ID3fake").unwrap();
        fs::write(&notes, b"some notes").unwrap();
        vec![record_for(&track), record_for(&notes)]
    }

    #[test]
    fn test_copy_batch_places_files_by_category() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = sample_batch(&src);

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Copy,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);
        assert!(out.path().join("audio").join("track.mp3").is_file());
        assert!(out.path().join("document").join("notes.txt").is_file());
        // Copy leaves sources in place.
        assert!(files[0].path.is_file());
    }

    #[test]
    fn test_move_batch_removes_sources() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = sample_batch(&src);

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Move,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 2);
        assert!(!files[0].path.exists());
        assert!(out.path().join("audio").join("track.mp3").is_file());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let src = tempfile::tempdir().unwrap();
        let out_parent = tempfile::tempdir().unwrap();
        let out_root = out_parent.path().join("organized");
        let files = sample_batch(&src);

        let options = BatchOptions::new(out_root.clone()).with_dry_run(true);
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Move,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 2);
        assert_eq!(report.preview.len(), 2);
        assert!(!out_root.exists());
        assert!(files[0].path.is_file());

        let row = report
            .preview
            .iter()
            .find(|r| r.source.ends_with("track.mp3"))
            .unwrap();
        assert_eq!(row.folder, PathBuf::from("audio"));
        assert_eq!(row.rule, "audio");
        assert_eq!(row.target, out_root.join("audio").join("track.mp3"));
    }

    #[test]
    fn test_failed_copy_keeps_source_and_leaves_no_partial_target() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let source = src.path().join("report.txt");
        fs::write(&source, b"quarterly numbers").unwrap();

        // Parent directory missing: the copy fails before any byte lands.
        let orphan = out.path().join("missing").join("report.txt");
        let err = move_file(&source, &orphan).unwrap_err();
        assert!(err.contains("Failed to copy"));
        assert!(!orphan.exists());
        assert_eq!(fs::read(&source).unwrap(), b"quarterly numbers");

        // Target occupied by a directory: rename and copy both fail, the
        // source survives untouched.
        let blocked = out.path().join("blocked");
        fs::create_dir_all(&blocked).unwrap();
        let err = move_file(&source, &blocked).unwrap_err();
        assert!(err.contains("Failed to copy"));
        assert_eq!(fs::read(&source).unwrap(), b"quarterly numbers");
    }

    #[test]
    fn test_missing_source_is_counted_and_batch_continues() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut files = sample_batch(&src);

        let ghost = src.path().join("gone.txt");
        fs::write(&ghost, b"x").unwrap();
        files.push(record_for(&ghost));
        fs::remove_file(&ghost).unwrap();

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Copy,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Source not found"));
    }

    #[test]
    fn test_name_collision_gets_unique_target() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("a");
        let b = src.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("dup.txt"), b"first").unwrap();
        fs::write(b.join("dup.txt"), b"second").unwrap();
        let files = vec![record_for(&a.join("dup.txt")), record_for(&b.join("dup.txt"))];

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Copy,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 2);
        let dest = out.path().join("document");
        assert!(dest.join("dup.txt").is_file());
        assert!(dest.join("dup_01.txt").is_file());
    }

    #[test]
    fn test_file_already_at_destination_is_skipped() {
        let out = tempfile::tempdir().unwrap();
        let dest_dir = out.path().join("document");
        fs::create_dir_all(&dest_dir).unwrap();
        let in_place = dest_dir.join("settled.txt");
        fs::write(&in_place, b"already organized").unwrap();

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &[record_for(&in_place)],
            &CategoryFolders::new(),
            OperationMode::Move,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.success_count, 0);
        assert!(in_place.is_file());
        assert!(!dest_dir.join("settled_01.txt").exists());
    }

    #[test]
    fn test_precancelled_batch_reports_cancelled() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = sample_batch(&src);
        let counter = Counter::default();
        let control = ScanControl::new();
        control.cancel();

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Copy,
            &options,
            &counter,
            &control,
        );

        assert_eq!(report.success_count, 0);
        assert_eq!(counter.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 0);
        assert_eq!(counter.progress.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_mode_creates_symlinks() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let notes = src.path().join("notes.txt");
        fs::write(&notes, b"linked").unwrap();

        let options = BatchOptions::new(out.path().to_path_buf());
        let report = execute_batch(
            &[record_for(&notes)],
            &CategoryFolders::new(),
            OperationMode::Link,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        assert_eq!(report.success_count, 1);
        let target = out.path().join("document").join("notes.txt");
        assert!(target.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&target).unwrap(), notes);
    }

    #[test]
    fn test_batch_log_records_each_operation() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let files = sample_batch(&src);

        let options = BatchOptions::new(out.path().to_path_buf())
            .with_log_dir(logs.path().to_path_buf());
        let report = execute_batch(
            &files,
            &CategoryFolders::new(),
            OperationMode::Copy,
            &options,
            &NullBatchEvents,
            &ScanControl::new(),
        );

        let content = fs::read_to_string(report.log_path.unwrap()).unwrap();
        assert!(content.contains("processing start mode=copy targets=2 dry_run=false"));
        assert!(content.contains("] ok "));
        assert!(content.contains(" -> "));
        assert!(content.contains("status=completed mode=copy dry_run=false processed=2 total=2"));
    }
}
