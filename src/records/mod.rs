//! Core data model for scanned files.
//!
//! This module provides:
//! - `value`: Typed attribute values produced by the metadata probes
//! - `record`: The per-file record and the coarse category enumeration

mod record;
mod value;

pub use record::*;
pub use value::*;
