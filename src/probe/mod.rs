//! Content probing.
//!
//! - `probe_file`: dispatches a file to the extractor for its category
//! - `hash`: streaming SHA-256 content hashing
//! - `ffprobe`: external tool runner for video metadata
//!
//! Extractors never panic outward and never fail the scan. Whatever goes
//! wrong with one file is captured in the report's error list.

mod archive;
mod audio;
mod document;
mod ffprobe;
mod font;
pub mod hash;
mod image;
mod model3d;
mod video;

pub use hash::hash_file;

use tracing::debug;

use crate::cache::ProbeCache;
use crate::records::{AttrMap, Category, FileRecord, Value};

/// Which extractor produced a report. `Basic` means no content-level
/// extraction applies to the category (or the tool for it is missing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEngine {
    Audio,
    Video,
    Image,
    Document,
    Model3d,
    Archive,
    Font,
    Basic,
}

impl ProbeEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeEngine::Audio => "audio",
            ProbeEngine::Video => "video",
            ProbeEngine::Image => "image",
            ProbeEngine::Document => "document",
            ProbeEngine::Model3d => "model3d",
            ProbeEngine::Archive => "archive",
            ProbeEngine::Font => "font",
            ProbeEngine::Basic => "basic",
        }
    }
}

/// Outcome of probing a single file.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub attributes: AttrMap,
    pub errors: Vec<String>,
    pub engine: ProbeEngine,
    pub from_cache: bool,
}

/// Maps a category to its extractor. Video falls back to `Basic` when
/// ffprobe is not installed so missing tools read as absent metadata,
/// not as broken files.
pub fn engine_for(category: Category) -> ProbeEngine {
    match category {
        Category::Audio => ProbeEngine::Audio,
        Category::Video if ffprobe::available() => ProbeEngine::Video,
        Category::Video => ProbeEngine::Basic,
        Category::Image => ProbeEngine::Image,
        Category::Document => ProbeEngine::Document,
        Category::Model3d => ProbeEngine::Model3d,
        Category::Archive => ProbeEngine::Archive,
        Category::Font => ProbeEngine::Font,
        Category::Data | Category::Config | Category::Executable | Category::Other => {
            ProbeEngine::Basic
        }
    }
}

pub fn ffprobe_available() -> bool {
    ffprobe::available()
}

/// Probes one file, consulting the cache first. Results with no errors
/// are written back to the cache so the next scan skips the extraction.
pub fn probe_file(record: &FileRecord, cache: Option<&ProbeCache>) -> ProbeReport {
    let engine = engine_for(record.category);

    if let Some(cache) = cache {
        if let Some(attributes) = cache.lookup(&record.path, record.size_bytes, record.modified_time)
        {
            debug!(path = %record.path.display(), "probe cache hit");
            return ProbeReport {
                attributes,
                errors: Vec::new(),
                engine,
                from_cache: true,
            };
        }
    }

    let mut errors = Vec::new();
    let mut attributes = match run_extractor(engine, record) {
        Ok(attributes) => attributes,
        Err(e) => {
            debug!(path = %record.path.display(), error = %e, "probe failed");
            errors.push(e);
            AttrMap::new()
        }
    };

    if let Some(mime) = mime_guess::from_path(&record.path).first() {
        attributes.insert(
            "mime_type".to_string(),
            Value::Text(mime.essence_str().to_string()),
        );
    }

    if errors.is_empty() {
        if let Some(cache) = cache {
            cache.store(&record.path, record.size_bytes, record.modified_time, &attributes);
        }
    }

    ProbeReport {
        attributes,
        errors,
        engine,
        from_cache: false,
    }
}

fn run_extractor(engine: ProbeEngine, record: &FileRecord) -> Result<AttrMap, String> {
    match engine {
        ProbeEngine::Audio => audio::extract(&record.path),
        ProbeEngine::Video => video::extract(&record.path),
        ProbeEngine::Image => image::extract(&record.path),
        ProbeEngine::Document => document::extract(&record.path, &record.extension),
        ProbeEngine::Model3d => model3d::extract(&record.path, &record.extension),
        ProbeEngine::Archive => archive::extract(&record.path, &record.extension),
        ProbeEngine::Font => font::extract(&record.path, &record.extension),
        ProbeEngine::Basic => Ok(AttrMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_for(path: &std::path::Path, category: Category) -> FileRecord {
        FileRecord::from_path(path, category).unwrap()
    }

    #[test]
    fn test_probe_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "quarterly totals look fine").unwrap();

        let report = probe_file(&record_for(&path, Category::Document), None);
        assert_eq!(report.engine, ProbeEngine::Document);
        assert!(!report.from_cache);
        assert!(report.errors.is_empty());
        assert_eq!(report.attributes.get("words"), Some(&Value::Int(4)));
        assert_eq!(
            report.attributes.get("mime_type"),
            Some(&Value::Text("text/plain".to_string()))
        );
    }

    #[test]
    fn test_probe_basic_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.dat");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let report = probe_file(&record_for(&path, Category::Data), None);
        assert_eq!(report.engine, ProbeEngine::Basic);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_probe_corrupt_image_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let report = probe_file(&record_for(&path, Category::Image), None);
        assert_eq!(report.engine, ProbeEngine::Image);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_probe_uses_cache_on_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "one two three").unwrap();
        let cache = ProbeCache::load(dir.path().join("cache.json"));

        let record = record_for(&path, Category::Document);
        let first = probe_file(&record, Some(&cache));
        assert!(!first.from_cache);

        let second = probe_file(&record, Some(&cache));
        assert!(second.from_cache);
        assert_eq!(second.attributes, first.attributes);
    }

    #[test]
    fn test_failed_probe_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"still not an image").unwrap();
        let cache = ProbeCache::load(dir.path().join("cache.json"));

        let record = record_for(&path, Category::Image);
        let first = probe_file(&record, Some(&cache));
        assert!(!first.errors.is_empty());

        let second = probe_file(&record, Some(&cache));
        assert!(!second.from_cache);
        assert!(!second.errors.is_empty());
    }
}
