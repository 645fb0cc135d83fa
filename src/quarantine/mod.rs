//! Quarantine for suspect files.
//!
//! Instead of deleting corruption candidates or duplicate removables
//! outright, callers move them into a timestamped batch folder under
//! the quarantine directory. Each batch carries a `manifest.json`
//! recording where every file came from, so the whole batch can be
//! restored or purged later. Nothing lands here automatically; both
//! directions are explicit caller actions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::execution::move_file;
use crate::paths::{allocate_unique_path, sanitize_segment};

const MANIFEST_NAME: &str = "manifest.json";

/// One quarantined file within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Where the file lived before quarantine.
    pub original: PathBuf,
    /// File name inside the batch folder; may differ from the original
    /// name when two quarantined files collide.
    pub stored_name: String,
    pub size_bytes: u64,
}

/// A batch folder plus its manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineBatch {
    /// Batch folder name, `{reason}_{YYYYMMDD_HHMMSS}`.
    pub id: String,
    pub reason: String,
    pub created_at: DateTime<Local>,
    pub entries: Vec<QuarantineEntry>,
}

#[derive(Debug, Clone)]
pub struct QuarantineManager {
    base_dir: PathBuf,
}

impl QuarantineManager {
    pub fn new() -> Result<Self, String> {
        let base_dir = dirs::data_local_dir()
            .ok_or_else(|| "Could not determine local data directory".to_string())?
            .join("curate")
            .join("quarantine");
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Moves the given files into a new batch folder and writes its
    /// manifest. Missing or unmovable files are skipped with a warning;
    /// an error is returned only when nothing could be quarantined.
    pub fn quarantine_files(
        &self,
        paths: &[PathBuf],
        reason: &str,
    ) -> Result<QuarantineBatch, String> {
        let created_at = Local::now();
        let safe_reason = sanitize_segment(reason, "quarantine");
        let stamp = created_at.format("%Y%m%d_%H%M%S");

        let mut id = format!("{}_{}", safe_reason, stamp);
        let mut counter = 1u32;
        while self.base_dir.join(&id).exists() {
            id = format!("{}_{}_{:02}", safe_reason, stamp, counter);
            counter += 1;
        }

        let batch_dir = self.base_dir.join(&id);
        fs::create_dir_all(&batch_dir)
            .map_err(|e| format!("Failed to create {}: {}", batch_dir.display(), e))?;

        let mut entries = Vec::new();
        for path in paths {
            let metadata = match fs::metadata(path) {
                Ok(m) if m.is_file() => m,
                Ok(_) => {
                    warn!(path = %path.display(), "Skipping non-file quarantine target");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping missing quarantine target");
                    continue;
                }
            };

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "file".to_string());
            let stored = match allocate_unique_path(&batch_dir, &name) {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to allocate quarantine slot");
                    continue;
                }
            };
            if let Err(e) = move_file(path, &stored) {
                warn!(path = %path.display(), error = %e, "Failed to quarantine file");
                continue;
            }

            entries.push(QuarantineEntry {
                original: path.clone(),
                stored_name: stored
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or(name),
                size_bytes: metadata.len(),
            });
        }

        if entries.is_empty() {
            let _ = fs::remove_dir(&batch_dir);
            return Err("No files could be quarantined".to_string());
        }

        let batch = QuarantineBatch {
            id: id.clone(),
            reason: reason.to_string(),
            created_at,
            entries,
        };
        self.write_manifest(&batch_dir, &batch)?;

        info!(
            batch = %id,
            files = batch.entries.len(),
            reason,
            "Quarantined files"
        );
        Ok(batch)
    }

    /// All batches with a readable manifest, newest first.
    pub fn list_batches(&self) -> Result<Vec<QuarantineBatch>, String> {
        let mut batches = Vec::new();
        if !self.base_dir.exists() {
            return Ok(batches);
        }

        let entries = fs::read_dir(&self.base_dir)
            .map_err(|e| format!("Failed to read {}: {}", self.base_dir.display(), e))?;
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            match self.read_manifest(&dir) {
                Ok(mut batch) => {
                    // The folder name is authoritative if the two disagree.
                    batch.id = entry.file_name().to_string_lossy().to_string();
                    batches.push(batch);
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable quarantine batch");
                }
            }
        }

        batches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(batches)
    }

    /// Moves every stored file back to its recorded original location,
    /// allocating a fresh name when the original path is taken again.
    /// Returns how many files were restored.
    pub fn restore_batch(&self, id: &str) -> Result<usize, String> {
        let batch_dir = self.batch_dir(id)?;
        let batch = self.read_manifest(&batch_dir)?;

        let mut restored = 0;
        let mut failed = 0;
        for entry in &batch.entries {
            let stored = batch_dir.join(&entry.stored_name);
            if !stored.is_file() {
                warn!(path = %stored.display(), "Quarantined file missing, skipping restore");
                failed += 1;
                continue;
            }

            let parent = entry
                .original
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = entry
                .original
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| entry.stored_name.clone());

            let target = allocate_unique_path(&parent, &name)?;
            match move_file(&stored, &target) {
                Ok(()) => restored += 1,
                Err(e) => {
                    warn!(path = %stored.display(), error = %e, "Failed to restore file");
                    failed += 1;
                }
            }
        }

        if failed == 0 {
            let _ = fs::remove_file(batch_dir.join(MANIFEST_NAME));
            let _ = fs::remove_dir(&batch_dir);
        }

        info!(batch = %id, restored, "Restored quarantine batch");
        Ok(restored)
    }

    /// Permanently deletes a batch folder and everything in it.
    pub fn purge_batch(&self, id: &str) -> Result<(), String> {
        let batch_dir = self.batch_dir(id)?;
        fs::remove_dir_all(&batch_dir)
            .map_err(|e| format!("Failed to purge {}: {}", batch_dir.display(), e))?;
        info!(batch = %id, "Purged quarantine batch");
        Ok(())
    }

    /// Resolves and validates a batch folder from its id. Ids are plain
    /// folder names; anything resembling a path is rejected.
    fn batch_dir(&self, id: &str) -> Result<PathBuf, String> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(format!("Invalid batch id: {}", id));
        }
        let dir = self.base_dir.join(id);
        if !dir.is_dir() {
            return Err(format!("Batch not found: {}", id));
        }
        Ok(dir)
    }

    fn write_manifest(&self, batch_dir: &Path, batch: &QuarantineBatch) -> Result<(), String> {
        let json = serde_json::to_string_pretty(batch)
            .map_err(|e| format!("Failed to serialize manifest: {}", e))?;
        let path = batch_dir.join(MANIFEST_NAME);
        fs::write(&path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    fn read_manifest(&self, batch_dir: &Path) -> Result<QuarantineBatch, String> {
        let path = batch_dir.join(MANIFEST_NAME);
        let json = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}
