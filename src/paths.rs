//! Path segment sanitization and collision-free destination naming.

use std::fs;
use std::path::{Path, PathBuf};

/// Turns an arbitrary string into a safe filesystem path segment.
///
/// Path separators, reserved characters, and control characters become `_`;
/// surrounding spaces and dots are stripped. Returns `fallback` when nothing
/// usable remains. Pure and idempotent.
pub fn sanitize_segment(raw: &str, fallback: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return fallback.to_string();
    }

    let replaced: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns a path under `dir` that does not exist at the time of the call.
///
/// `dir` is created (with parents) if absent; the returned file itself is
/// not created, so repeated calls without creating it return the same path.
/// On collision the name becomes `{stem}_{NN}{ext}` with a two-digit
/// counter. Not synchronized; callers racing on one destination directory
/// must serialize allocation themselves.
pub fn allocate_unique_path(dir: &Path, filename: &str) -> Result<PathBuf, String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;

    let candidate = dir.join(filename);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let base = Path::new(filename);
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{:02}{}", stem, counter, ext));
        if !candidate.exists() {
            return Ok(candidate);
        }
        counter += 1;
    }
}
