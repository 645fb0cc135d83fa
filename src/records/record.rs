//! File records and the coarse category enumeration.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::value::{AttrMap, Value};

static ABSENT: Value = Value::Absent;

/// Coarse file category, detected once per file from the extension table
/// with a MIME fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Audio,
    Video,
    Image,
    Document,
    Model3d,
    Archive,
    Font,
    Data,
    Config,
    Executable,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Audio => "audio",
            Category::Video => "video",
            Category::Image => "image",
            Category::Document => "document",
            Category::Model3d => "model3d",
            Category::Archive => "archive",
            Category::Font => "font",
            Category::Data => "data",
            Category::Config => "config",
            Category::Executable => "executable",
            Category::Other => "other",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Category::Audio,
            Category::Video,
            Category::Image,
            Category::Document,
            Category::Model3d,
            Category::Archive,
            Category::Font,
            Category::Data,
            Category::Config,
            Category::Executable,
            Category::Other,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased extension including the leading dot, or empty if none.
pub fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => String::new(),
    }
}

/// One physical file as seen by the scan pipeline.
///
/// Created when a regular file is visited, enriched by the probe and the
/// classifier, then shared read-only with the aggregation tree and any
/// downstream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path; immutable once created.
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Lower-cased extension with leading dot, or empty.
    pub extension: String,
    pub size_bytes: u64,
    /// Seconds since the epoch; fractional part kept for cache checks.
    pub modified_time: f64,
    /// Lazily computed SHA-256 hex digest.
    pub content_hash: Option<String>,
    pub category: Category,
    /// Flat probe output.
    pub attributes: AttrMap,
    /// Ordered, de-duplicated human-readable reasons.
    pub anomalies: Vec<String>,
}

impl FileRecord {
    /// Builds a record from an already-fetched metadata handle.
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata, category: Category) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let modified_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            path: path.to_path_buf(),
            name,
            extension: extension_of(path),
            size_bytes: metadata.len(),
            modified_time,
            content_hash: None,
            category,
            attributes: AttrMap::new(),
            anomalies: Vec::new(),
        }
    }

    /// Stats the path and builds a record.
    pub fn from_path(path: &Path, category: Category) -> Result<Self, String> {
        let metadata = fs::metadata(path)
            .map_err(|e| format!("Failed to stat {}: {}", path.display(), e))?;
        Ok(Self::from_metadata(path, &metadata, category))
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Local modification timestamp, if the mtime was available and sane.
    pub fn modified_datetime(&self) -> Option<DateTime<Local>> {
        if self.modified_time <= 0.0 {
            return None;
        }
        Local
            .timestamp_opt(
                self.modified_time as i64,
                ((self.modified_time.fract()) * 1e9) as u32,
            )
            .single()
    }

    /// Attribute lookup; a missing key reads as `Absent`.
    pub fn attr(&self, key: &str) -> &Value {
        self.attributes.get(key).unwrap_or(&ABSENT)
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Appends a reason unless an identical one is already recorded.
    pub fn push_anomaly(&mut self, reason: String) {
        if !self.anomalies.iter().any(|r| r == &reason) {
            self.anomalies.push(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/tmp/Track.FLAC")), ".flac");
        assert_eq!(extension_of(Path::new("/tmp/README")), "");
        assert_eq!(extension_of(Path::new("/tmp/archive.tar.gz")), ".gz");
    }

    #[test]
    fn test_from_path_populates_stat_fields() {
        let mut file = NamedTempFile::with_suffix(".wav").unwrap();
        file.write_all(b"RIFF0000WAVE").unwrap();
        file.flush().unwrap();

        let record = FileRecord::from_path(file.path(), Category::Audio).unwrap();
        assert_eq!(record.extension, ".wav");
        assert_eq!(record.size_bytes, 12);
        assert!(record.modified_time > 0.0);
        assert!(record.content_hash.is_none());
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn test_missing_attribute_reads_as_absent() {
        let file = NamedTempFile::new().unwrap();
        let record = FileRecord::from_path(file.path(), Category::Other).unwrap();
        assert!(record.attr("duration").is_absent());
        assert_eq!(record.attr_f64("duration"), None);
    }

    #[test]
    fn test_push_anomaly_deduplicates_in_order() {
        let file = NamedTempFile::new().unwrap();
        let mut record = FileRecord::from_path(file.path(), Category::Other).unwrap();
        record.push_anomaly("file size is 0 bytes".to_string());
        record.push_anomaly("name contains control characters".to_string());
        record.push_anomaly("file size is 0 bytes".to_string());
        assert_eq!(
            record.anomalies,
            vec![
                "file size is 0 bytes".to_string(),
                "name contains control characters".to_string(),
            ]
        );
    }

    #[test]
    fn test_hidden_name() {
        let record = FileRecord {
            path: PathBuf::from("/tmp/.DS_Store"),
            name: ".DS_Store".to_string(),
            extension: String::new(),
            size_bytes: 0,
            modified_time: 0.0,
            content_hash: None,
            category: Category::Other,
            attributes: AttrMap::new(),
            anomalies: Vec::new(),
        };
        assert!(record.is_hidden());
    }
}
