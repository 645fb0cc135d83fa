//! Destination resolution strategies for batch execution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::paths::sanitize_segment;
use crate::records::{Category, FileRecord};
use crate::template::TemplateEngine;

/// Where one file should land: a folder relative to the output root,
/// plus the name of the rule that chose it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub folder: PathBuf,
    pub rule: String,
}

pub trait DestinationResolver {
    fn resolve(&self, record: &FileRecord) -> Result<Resolution, String>;
}

/// Puts every file under a fixed folder named after its category.
#[derive(Debug, Clone)]
pub struct CategoryFolders {
    folders: BTreeMap<Category, String>,
}

impl CategoryFolders {
    pub fn new() -> Self {
        let folders = Category::all()
            .iter()
            .map(|c| (*c, c.as_str().to_string()))
            .collect();
        Self { folders }
    }

    /// Overrides the folder name for one category. The name is
    /// sanitized like any other path segment.
    pub fn with_folder(mut self, category: Category, name: &str) -> Self {
        self.folders
            .insert(category, sanitize_segment(name, category.as_str()));
        self
    }
}

impl Default for CategoryFolders {
    fn default() -> Self {
        Self::new()
    }
}

impl DestinationResolver for CategoryFolders {
    fn resolve(&self, record: &FileRecord) -> Result<Resolution, String> {
        let folder = self
            .folders
            .get(&record.category)
            .cloned()
            .unwrap_or_else(|| record.category.as_str().to_string());
        Ok(Resolution {
            folder: PathBuf::from(folder),
            rule: record.category.as_str().to_string(),
        })
    }
}

/// Resolves destinations through a [`TemplateEngine`], one context per
/// record, surfacing the selected rule name for previews.
#[derive(Debug, Clone)]
pub struct TemplatePlan {
    engine: TemplateEngine,
    now: DateTime<Local>,
}

impl TemplatePlan {
    pub fn new(engine: TemplateEngine) -> Self {
        Self {
            engine,
            now: Local::now(),
        }
    }

    /// Clock used for date tokens; injectable for reproducible plans.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }
}

impl DestinationResolver for TemplatePlan {
    fn resolve(&self, record: &FileRecord) -> Result<Resolution, String> {
        let placement = self.engine.plan(record, self.now);
        Ok(Resolution {
            folder: placement.folder,
            rule: placement.rule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::AttrMap;
    use chrono::TimeZone;

    fn record(path: &str, category: Category) -> FileRecord {
        let path = PathBuf::from(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = crate::records::extension_of(&path);
        FileRecord {
            path,
            name,
            extension,
            size_bytes: 1024,
            modified_time: 1_700_000_000.0,
            content_hash: None,
            category,
            attributes: AttrMap::new(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_category_folders_use_category_names() {
        let resolver = CategoryFolders::new();
        let resolution = resolver
            .resolve(&record("/library/track.mp3", Category::Audio))
            .unwrap();
        assert_eq!(resolution.folder, PathBuf::from("audio"));
        assert_eq!(resolution.rule, "audio");
    }

    #[test]
    fn test_category_folder_override_is_sanitized() {
        let resolver = CategoryFolders::new().with_folder(Category::Audio, "My: Music");
        let resolution = resolver
            .resolve(&record("/library/track.mp3", Category::Audio))
            .unwrap();
        assert_eq!(resolution.folder, PathBuf::from("My_ Music"));
    }

    #[test]
    fn test_template_plan_exposes_rule_name() {
        let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let engine = TemplateEngine::new("{media_type}/{ext}");
        let resolver = TemplatePlan::new(engine).with_now(now);

        let resolution = resolver
            .resolve(&record("/library/notes.txt", Category::Document))
            .unwrap();
        assert_eq!(resolution.folder, PathBuf::from("document/txt"));
        assert_eq!(resolution.rule, "default");
    }
}
