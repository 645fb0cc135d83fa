//! Saved template configurations.
//!
//! Presets are plain JSON files a user can write or edit by hand, so
//! loading tolerates missing fields and loose value types.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::engine::{RuleWhen, TemplateRule};
use crate::paths::sanitize_segment;

/// Ready-made folder patterns, most broadly useful first.
pub const STARTER_TEMPLATES: &[&str] = &[
    "{media_type}/{year}/{month}/{ext}",
    "{year}/{month}/{ext}",
    "{media_type}/{ext}",
    "{ext}/{year}/{month}",
    "{top_folder}/{parent}/{ext}",
];

/// A complete template configuration as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePreset {
    #[serde(default)]
    pub name: String,
    pub template: String,
    #[serde(default = "default_unknown", rename = "unknown")]
    pub unknown_value: String,
    #[serde(default)]
    pub use_conditions: bool,
    #[serde(default)]
    pub rules: Vec<TemplateRule>,
}

fn default_unknown() -> String {
    "unknown".to_string()
}

/// Example conditional rules showing the predicate shapes presets
/// support.
pub fn sample_rules() -> Vec<TemplateRule> {
    vec![
        TemplateRule {
            name: "huge_media".to_string(),
            template: "huge/{media_type}/{year}/{month}".to_string(),
            when: RuleWhen {
                min_size_mb: Some(json!(1024)),
                media_type: Some(json!(["video", "audio"])),
                ..RuleWhen::default()
            },
        },
        TemplateRule {
            name: "images_small".to_string(),
            template: "images/small/{year}/{month}/{ext}".to_string(),
            when: RuleWhen {
                media_type: Some(json!("image")),
                max_size_mb: Some(json!(20)),
                ..RuleWhen::default()
            },
        },
        TemplateRule {
            name: "documents".to_string(),
            template: "docs/{year}/{month}/{ext}".to_string(),
            when: RuleWhen {
                media_type: Some(json!("document")),
                ..RuleWhen::default()
            },
        },
    ]
}

/// Directory of saved presets.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("curate").join("presets").join("template_build"))
    }

    pub fn open_default() -> Result<Self, String> {
        let dir = Self::default_dir()
            .ok_or_else(|| "Could not determine preset directory".to_string())?;
        Ok(Self::at(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a preset as pretty JSON. A named preset gets a stable
    /// filename and overwrites its previous version; an unnamed one gets
    /// a timestamped name.
    pub fn save(&self, preset: &TemplatePreset) -> Result<PathBuf, String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create preset directory {}: {}", self.dir.display(), e))?;

        let name = preset.name.trim();
        let filename = if name.is_empty() {
            format!(
                "preset_{}.json",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )
        } else {
            format!("{}.json", sanitize_segment(name, "preset"))
        };

        let path = self.dir.join(filename);
        let json = serde_json::to_string_pretty(preset)
            .map_err(|e| format!("Failed to serialize preset: {}", e))?;
        fs::write(&path, json)
            .map_err(|e| format!("Failed to write preset {}: {}", path.display(), e))?;
        info!(path = %path.display(), "Saved template preset");
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<TemplatePreset, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read preset {}: {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse preset {}: {}", path.display(), e))
    }

    /// Paths of all saved presets, sorted by filename.
    pub fn list(&self) -> Result<Vec<PathBuf>, String> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| format!("Failed to read preset directory {}: {}", self.dir.display(), e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();
        Ok(paths)
    }
}
