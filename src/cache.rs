//! Persisted probe-result cache.
//!
//! Keyed by absolute path; an entry is valid only while the file's size
//! matches and its mtime is within a sub-second tolerance. The on-disk form
//! is hand-editable pretty JSON; a missing or corrupt file loads as an empty
//! cache rather than an error. Saves write a temp file and rename it into
//! place so a crash mid-write never leaves a corrupt cache behind.

use chrono::Local;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::records::AttrMap;

const MTIME_TOLERANCE_SECS: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub size: u64,
    pub mtime: f64,
    pub data: AttrMap,
    pub cached_at: String,
}

/// Process-scoped probe cache with an explicit load/save lifecycle.
///
/// Injected into the probe layer; concurrent readers are safe.
#[derive(Debug)]
pub struct ProbeCache {
    path: PathBuf,
    entries: DashMap<String, CacheEntry>,
}

impl ProbeCache {
    /// Platform default location under the user cache directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("curate").join("probe_cache.json"))
    }

    /// Loads the cache at the platform default location.
    pub fn open_default() -> Result<Self, String> {
        let path = Self::default_path()
            .ok_or_else(|| "Could not determine cache directory".to_string())?;
        Ok(Self::load(path))
    }

    /// Loads a cache file, tolerating absence and corruption.
    pub fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&text) {
                Ok(map) => {
                    let loaded: DashMap<String, CacheEntry> = map.into_iter().collect();
                    tracing::debug!(
                        path = %path.display(),
                        entries = loaded.len(),
                        "Loaded probe cache"
                    );
                    loaded
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring corrupt probe cache"
                    );
                    DashMap::new()
                }
            },
            Err(_) => DashMap::new(),
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached attribute map if the entry is still valid for the
    /// file's current size and mtime.
    pub fn lookup(&self, path: &Path, size: u64, mtime: f64) -> Option<AttrMap> {
        let entry = self.entries.get(&cache_key(path))?;
        if entry.size == size && (entry.mtime - mtime).abs() < MTIME_TOLERANCE_SECS {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn store(&self, path: &Path, size: u64, mtime: f64, data: &AttrMap) {
        self.entries.insert(
            cache_key(path),
            CacheEntry {
                size,
                mtime,
                data: data.clone(),
                cached_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            },
        );
    }

    pub fn remove(&self, path: &Path) {
        self.entries.remove(&cache_key(path));
    }

    /// Writes the cache atomically (temp file, then rename).
    pub fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                format!("Failed to create cache directory {}: {}", parent.display(), e)
            })?;
        }

        let snapshot: BTreeMap<String, CacheEntry> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("Failed to serialize probe cache: {}", e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| format!("Failed to write cache file {}: {}", tmp.display(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| format!("Failed to replace cache file {}: {}", self.path.display(), e))?;

        tracing::debug!(path = %self.path.display(), entries = self.len(), "Saved probe cache");
        Ok(())
    }
}

fn cache_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
