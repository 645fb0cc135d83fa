//! Per-file token context for folder templates.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::records::FileRecord;

/// Size bands used by the `{size_band}` token and the `size_band` rule
/// predicate.
pub fn size_band_for_mb(size_mb: f64) -> &'static str {
    if size_mb < 1.0 {
        "tiny"
    } else if size_mb < 10.0 {
        "small"
    } else if size_mb < 100.0 {
        "medium"
    } else if size_mb < 1024.0 {
        "large"
    } else {
        "huge"
    }
}

/// Everything a folder template can reference for one file. All string
/// fields already carry the unknown placeholder when the underlying
/// value is missing, except `name` and `stem` which stay as on disk.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub media_type: String,
    pub ext: String,
    pub ext_dot: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub name: String,
    pub stem: String,
    pub size_band: String,
    pub top_folder: String,
    pub parent: String,
    pub parent_1: String,
    pub parent_2: String,
    pub parent_3: String,
    pub rel_dir: String,
    pub size_mb: f64,
    pub size_bytes: u64,
    pub path: String,
}

impl TemplateContext {
    /// Builds the context from an already-scanned record. `roots` are the
    /// scan roots; the deepest one containing the file anchors the
    /// relative-folder tokens. `now` stands in when the record has no
    /// usable modified time.
    pub fn build(
        record: &FileRecord,
        roots: &[PathBuf],
        unknown_value: &str,
        now: DateTime<Local>,
    ) -> Self {
        let unknown = unknown_value.to_string();

        let ext_dot = if record.extension.is_empty() {
            unknown.clone()
        } else {
            record.extension.clone()
        };
        let ext = record
            .extension
            .strip_prefix('.')
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| unknown.clone());

        let mtime = record.modified_datetime().unwrap_or(now);
        let size_mb = record.size_mb();

        let parent = record
            .path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| unknown.clone());

        let mut top_folder = unknown.clone();
        let mut parent_1 = unknown.clone();
        let mut parent_2 = unknown.clone();
        let mut parent_3 = unknown.clone();
        let mut rel_dir = unknown.clone();
        if let Some(root) = deepest_root(&record.path, roots) {
            if let Some(rel_parts) = relative_dir_parts(&record.path, root) {
                if !rel_parts.is_empty() {
                    top_folder = rel_parts[0].clone();
                    parent_1 = rel_parts[rel_parts.len() - 1].clone();
                    if rel_parts.len() >= 2 {
                        parent_2 = rel_parts[rel_parts.len() - 2].clone();
                    }
                    if rel_parts.len() >= 3 {
                        parent_3 = rel_parts[rel_parts.len() - 3].clone();
                    }
                    rel_dir = rel_parts.join("/");
                }
            }
        }

        let stem = Path::new(&record.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            media_type: record.category.as_str().to_string(),
            ext,
            ext_dot,
            year: format!("{:04}", mtime.year()),
            month: format!("{:02}", mtime.month()),
            day: format!("{:02}", mtime.day()),
            hour: format!("{:02}", mtime.hour()),
            name: record.name.clone(),
            stem,
            size_band: size_band_for_mb(size_mb).to_string(),
            top_folder,
            parent,
            parent_1,
            parent_2,
            parent_3,
            rel_dir,
            size_mb,
            size_bytes: record.size_bytes,
            path: record.path.display().to_string(),
        }
    }

    /// Looks up one template token by name.
    pub fn token(&self, name: &str) -> Option<String> {
        let value = match name {
            "media_type" => self.media_type.clone(),
            "ext" => self.ext.clone(),
            "ext_dot" => self.ext_dot.clone(),
            "year" => self.year.clone(),
            "month" => self.month.clone(),
            "day" => self.day.clone(),
            "hour" => self.hour.clone(),
            "name" => self.name.clone(),
            "stem" => self.stem.clone(),
            "size_band" => self.size_band.clone(),
            "top_folder" => self.top_folder.clone(),
            "parent" => self.parent.clone(),
            "parent_1" => self.parent_1.clone(),
            "parent_2" => self.parent_2.clone(),
            "parent_3" => self.parent_3.clone(),
            "rel_dir" => self.rel_dir.clone(),
            "size_mb" => format_size_mb(self.size_mb),
            "size_bytes" => self.size_bytes.to_string(),
            "path" => self.path.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// The deepest configured root that contains the file, by path length.
fn deepest_root<'a>(path: &Path, roots: &'a [PathBuf]) -> Option<&'a PathBuf> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.as_os_str().len())
}

/// Directory components of the file's parent, relative to `root`.
fn relative_dir_parts(path: &Path, root: &Path) -> Option<Vec<String>> {
    let parent = path.parent()?;
    let relative = parent.strip_prefix(root).ok()?;
    Some(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .filter(|part| !part.is_empty() && part != ".")
            .collect(),
    )
}

fn format_size_mb(size_mb: f64) -> String {
    let rounded = (size_mb * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AttrMap, Category};

    fn record_at(path: &str, size: u64, mtime: f64) -> FileRecord {
        let path = PathBuf::from(path);
        FileRecord {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extension: crate::records::extension_of(&path),
            path,
            size_bytes: size,
            modified_time: mtime,
            content_hash: None,
            category: Category::Audio,
            attributes: AttrMap::new(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_context_tokens_with_root() {
        // 2021-03-04 around midday UTC; exact hour depends on local offset.
        let record = record_at("/library/sessions/day1/take.wav", 5 * 1024 * 1024, 1_614_855_600.0);
        let roots = vec![PathBuf::from("/library")];
        let ctx = TemplateContext::build(&record, &roots, "unknown", Local::now());

        assert_eq!(ctx.media_type, "audio");
        assert_eq!(ctx.ext, "wav");
        assert_eq!(ctx.ext_dot, ".wav");
        assert_eq!(ctx.name, "take.wav");
        assert_eq!(ctx.stem, "take");
        assert_eq!(ctx.size_band, "small");
        assert_eq!(ctx.top_folder, "sessions");
        assert_eq!(ctx.parent, "day1");
        assert_eq!(ctx.parent_1, "day1");
        assert_eq!(ctx.parent_2, "sessions");
        assert_eq!(ctx.parent_3, "unknown");
        assert_eq!(ctx.rel_dir, "sessions/day1");
        assert_eq!(ctx.year.len(), 4);
        assert_eq!(ctx.token("size_bytes"), Some((5 * 1024 * 1024).to_string()));
        assert_eq!(ctx.token("no_such_token"), None);
    }

    #[test]
    fn test_context_without_matching_root() {
        let record = record_at("/elsewhere/file.mp3", 100, 0.0);
        let roots = vec![PathBuf::from("/library")];
        let ctx = TemplateContext::build(&record, &roots, "unknown", Local::now());

        assert_eq!(ctx.top_folder, "unknown");
        assert_eq!(ctx.parent_1, "unknown");
        assert_eq!(ctx.rel_dir, "unknown");
        assert_eq!(ctx.parent, "elsewhere");
    }

    #[test]
    fn test_deepest_root_wins() {
        let roots = vec![PathBuf::from("/data"), PathBuf::from("/data/projects")];
        let path = Path::new("/data/projects/alpha/cut.mov");
        assert_eq!(
            deepest_root(path, &roots),
            Some(&PathBuf::from("/data/projects"))
        );
    }

    #[test]
    fn test_file_directly_under_root() {
        let record = record_at("/library/loose.pdf", 10, 1_600_000_000.0);
        let roots = vec![PathBuf::from("/library")];
        let ctx = TemplateContext::build(&record, &roots, "unknown", Local::now());

        assert_eq!(ctx.top_folder, "unknown");
        assert_eq!(ctx.rel_dir, "unknown");
        assert_eq!(ctx.parent, "library");
    }

    #[test]
    fn test_size_bands() {
        assert_eq!(size_band_for_mb(0.2), "tiny");
        assert_eq!(size_band_for_mb(5.0), "small");
        assert_eq!(size_band_for_mb(50.0), "medium");
        assert_eq!(size_band_for_mb(500.0), "large");
        assert_eq!(size_band_for_mb(2048.0), "huge");
    }

    #[test]
    fn test_missing_extension_uses_unknown() {
        let record = record_at("/library/README", 10, 1_600_000_000.0);
        let roots = vec![PathBuf::from("/library")];
        let ctx = TemplateContext::build(&record, &roots, "unknown", Local::now());
        assert_eq!(ctx.ext, "unknown");
        assert_eq!(ctx.ext_dot, "unknown");
    }

    #[test]
    fn test_format_size_mb() {
        assert_eq!(format_size_mb(5.0), "5.0");
        assert_eq!(format_size_mb(0.5), "0.5");
        assert_eq!(format_size_mb(0.123456), "0.1235");
    }
}
