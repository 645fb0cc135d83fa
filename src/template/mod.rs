//! Folder templates.
//!
//! - `context`: per-file token values
//! - `engine`: conditional rules, selection, and rendering
//! - `presets`: saved configurations on disk

mod context;
mod engine;
mod presets;

pub use context::*;
pub use engine::*;
pub use presets::*;
