//! Shared cancel/pause switches for long-running jobs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable-by-Arc control handle. The owning side flips the flags;
/// the worker polls them between files.
#[derive(Debug, Default)]
pub struct ScanControl {
    cancelled: AtomicBool,
    paused: AtomicBool,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancellation is one-way; a cancelled job never resumes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
