//! Batch execution.
//!
//! - `resolver`: destination resolution strategies
//! - `executor`: the copy/move/link batch loop

mod executor;
mod resolver;

pub use executor::{
    execute_batch, BatchEvents, BatchOptions, BatchReport, NullBatchEvents, OperationMode,
    PreviewRow,
};
pub(crate) use executor::move_file;
pub use resolver::{CategoryFolders, DestinationResolver, Resolution, TemplatePlan};
