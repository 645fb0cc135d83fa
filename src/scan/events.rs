//! Observer trait for scan progress.
//!
//! Callers pass an implementation to receive progress callbacks; every
//! method has a no-op default so observers implement only what they
//! display.

use std::path::Path;

use super::pipeline::ScanOutcome;

pub trait ScanEvents: Send + Sync {
    /// Fired during the counting phase. `total` is 0 while the final
    /// count is still unknown.
    fn on_count_progress(&self, _done: usize, _total: usize, _path: &Path) {}

    /// Fired once per file before it is analyzed.
    fn on_scan_progress(&self, _done: usize, _total: usize, _path: &Path) {}

    fn on_paused(&self) {}

    fn on_resumed(&self) {}

    fn on_completed(&self, _outcome: &ScanOutcome) {}

    fn on_cancelled(&self, _outcome: &ScanOutcome) {}

    fn on_error(&self, _message: &str) {}
}

/// Observer that ignores everything.
pub struct NullEvents;

impl ScanEvents for NullEvents {}
