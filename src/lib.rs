//! Classify, aggregate, and reorganize large file collections.
//!
//! The core flow: a [`ScanPipeline`] walks the configured roots,
//! probes each file for type-specific attributes, classifies it into
//! bucket axes, and folds everything into a [`CategoryTree`]. On top
//! of the scan results sit duplicate detection ([`DuplicateFinder`]),
//! template-driven folder planning ([`TemplateEngine`]), batch
//! copy/move/link execution ([`execute_batch`]), and a quarantine area
//! for suspect files ([`QuarantineManager`]).

pub mod aggregate;
pub mod anomaly;
pub mod cache;
pub mod classify;
pub mod dupes;
pub mod execution;
pub mod oplog;
pub mod paths;
pub mod probe;
pub mod quarantine;
pub mod records;
pub mod scan;
pub mod template;

pub use aggregate::{aggregate_records, Aggregator, CategoryBucket, CategoryTree};
pub use anomaly::{detect_content_anomalies, detect_name_anomalies};
pub use cache::ProbeCache;
pub use classify::{classify, classify_at, detect_category};
pub use dupes::{DuplicateFinder, DuplicateGroup, DuplicateMode, RemovalAction};
pub use execution::{
    execute_batch, BatchEvents, BatchOptions, BatchReport, CategoryFolders, DestinationResolver,
    NullBatchEvents, OperationMode, PreviewRow, Resolution, TemplatePlan,
};
pub use oplog::OperationLog;
pub use paths::{allocate_unique_path, sanitize_segment};
pub use probe::{ffprobe_available, hash_file, probe_file, ProbeEngine, ProbeReport};
pub use quarantine::{QuarantineBatch, QuarantineEntry, QuarantineManager};
pub use records::{AttrMap, Category, FileRecord, Value};
pub use scan::{
    JobError, NullEvents, ScanControl, ScanEvents, ScanHandle, ScanOptions, ScanOutcome,
    ScanPipeline, ScanState,
};
pub use template::{
    PresetStore, TemplateEngine, TemplatePlacement, TemplatePreset, TemplateRule,
    STARTER_TEMPLATES,
};

use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber filtered by `RUST_LOG`.
/// Default: warnings everywhere, info for this crate's job summaries.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,curate=info")),
        )
        .try_init();
}
