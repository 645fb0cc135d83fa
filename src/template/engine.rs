//! Conditional rule evaluation and template rendering.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::context::TemplateContext;
use super::presets::TemplatePreset;
use crate::paths::sanitize_segment;
use crate::records::FileRecord;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("token pattern is valid"));

/// Conditions for one template rule. Fields hold raw JSON so presets
/// written by hand keep working: scalars and lists are both accepted,
/// and numbers may arrive as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleWhen {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size_mb: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_mb: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_band: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_contains: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<JsonValue>,
}

impl RuleWhen {
    /// Every present condition must hold. An unparseable numeric bound
    /// fails the rule rather than erroring the run.
    pub fn matches(&self, context: &TemplateContext) -> bool {
        if let Some(expected) = &self.media_type {
            if !matches_scalar_or_list(expected, &context.media_type.to_lowercase(), &lowercase) {
                return false;
            }
        }

        if let Some(expected) = &self.ext {
            if !matches_scalar_or_list(expected, &normalize_ext(&context.ext_dot), &normalize_ext)
            {
                return false;
            }
        }

        if let Some(bound) = &self.min_size_mb {
            match to_f64(bound) {
                Some(min) if context.size_mb >= min => {}
                _ => return false,
            }
        }

        if let Some(bound) = &self.max_size_mb {
            match to_f64(bound) {
                Some(max) if context.size_mb <= max => {}
                _ => return false,
            }
        }

        if let Some(expected) = &self.size_band {
            if !matches_scalar_or_list(expected, &context.size_band.to_lowercase(), &lowercase) {
                return false;
            }
        }

        if let Some(expected) = &self.year {
            if context.year != plain_string(expected) {
                return false;
            }
        }
        if let Some(expected) = &self.month {
            if context.month != zero_pad(&plain_string(expected)) {
                return false;
            }
        }
        if let Some(expected) = &self.day {
            if context.day != zero_pad(&plain_string(expected)) {
                return false;
            }
        }

        if let Some(needle) = &self.path_contains {
            if !context.path.contains(&plain_string(needle)) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !context.name.contains(&plain_string(needle)) {
                return false;
            }
        }

        true
    }
}

/// One conditional template: when the conditions match, the rule's
/// template is used and the placement is tagged with the rule's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub when: RuleWhen,
}

/// Picks the first matching rule's template. Rules with an empty
/// template are skipped; the default template is the final fallback and
/// reports as rule "default".
pub fn select_template(
    default_template: &str,
    rules: &[TemplateRule],
    context: &TemplateContext,
) -> (String, String) {
    for (idx, rule) in rules.iter().enumerate() {
        let template = rule.template.trim();
        if template.is_empty() {
            continue;
        }
        if rule.when.matches(context) {
            let name = rule.name.trim();
            let name = if name.is_empty() {
                format!("rule_{}", idx + 1)
            } else {
                name.to_string()
            };
            return (template.to_string(), name);
        }
    }
    (default_template.to_string(), "default".to_string())
}

/// Expands a template into a safe relative folder path. Token values are
/// sanitized before splitting, so a value can never introduce its own
/// path separators, and `.`/`..` segments from the template are dropped.
pub fn render_folder(template: &str, context: &TemplateContext, unknown_value: &str) -> PathBuf {
    let mut rendered = template.to_string();
    for captures in TOKEN_PATTERN.captures_iter(template) {
        let token = &captures[1];
        let value = context
            .token(token)
            .unwrap_or_else(|| unknown_value.to_string());
        rendered = rendered.replace(
            &format!("{{{}}}", token),
            &sanitize_segment(&value, unknown_value),
        );
    }

    let rendered = rendered.replace('\\', "/");
    let parts: Vec<String> = rendered
        .split('/')
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
        .map(|p| sanitize_segment(p, unknown_value))
        .collect();

    if parts.is_empty() {
        return PathBuf::from(unknown_value);
    }
    parts.iter().collect()
}

/// Where one file should land, and which rule put it there.
#[derive(Debug, Clone)]
pub struct TemplatePlacement {
    pub folder: PathBuf,
    pub rule: String,
    pub template: String,
}

/// Template configuration applied uniformly across a batch of files.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    default_template: String,
    unknown_value: String,
    rules: Vec<TemplateRule>,
    roots: Vec<PathBuf>,
}

impl TemplateEngine {
    pub fn new(default_template: impl Into<String>) -> Self {
        Self {
            default_template: default_template.into(),
            unknown_value: "unknown".to_string(),
            rules: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Builds an engine from a saved preset. Conditional rules apply
    /// only when the preset has them switched on.
    pub fn from_preset(preset: &TemplatePreset) -> Self {
        let mut engine =
            Self::new(preset.template.clone()).with_unknown_value(preset.unknown_value.clone());
        if preset.use_conditions {
            engine = engine.with_rules(preset.rules.clone());
        }
        engine
    }

    pub fn with_unknown_value(mut self, unknown_value: impl Into<String>) -> Self {
        let value = unknown_value.into();
        let trimmed = value.trim();
        self.unknown_value = if trimmed.is_empty() {
            "unknown".to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    pub fn with_rules(mut self, rules: Vec<TemplateRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Scan roots used to resolve the relative-folder tokens.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn unknown_value(&self) -> &str {
        &self.unknown_value
    }

    /// Resolves the destination folder for one record.
    pub fn plan(&self, record: &FileRecord, now: DateTime<Local>) -> TemplatePlacement {
        let context = TemplateContext::build(record, &self.roots, &self.unknown_value, now);
        let (template, rule) = select_template(&self.default_template, &self.rules, &context);
        let folder = render_folder(&template, &context, &self.unknown_value);
        TemplatePlacement {
            folder,
            rule,
            template,
        }
    }
}

fn plain_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lowercase(raw: &str) -> String {
    raw.to_lowercase()
}

fn normalize_ext(raw: &str) -> String {
    let raw = raw.trim().to_lowercase();
    if raw.is_empty() {
        return raw;
    }
    if raw.starts_with('.') {
        raw
    } else {
        format!(".{}", raw)
    }
}

fn zero_pad(raw: &str) -> String {
    format!("{:0>2}", raw)
}

fn matches_scalar_or_list(
    expected: &JsonValue,
    actual: &str,
    normalize: &dyn Fn(&str) -> String,
) -> bool {
    match expected {
        JsonValue::Array(items) => items
            .iter()
            .any(|item| normalize(&plain_string(item)) == actual),
        other => normalize(&plain_string(other)) == actual,
    }
}
