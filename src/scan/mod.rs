//! Scan orchestration.
//!
//! - `control`: cancel/pause switches shared with the caller
//! - `events`: observer trait for progress callbacks
//! - `pipeline`: the count/probe/classify/aggregate loop

mod control;
mod events;
mod pipeline;

pub use control::ScanControl;
pub use events::{NullEvents, ScanEvents};
pub use pipeline::{
    JobError, ScanHandle, ScanOptions, ScanOutcome, ScanPipeline, ScanState,
};
