//! Anomaly detection.
//!
//! Two detectors feed `FileRecord::anomalies`: one looks at the file name
//! for encoding damage, the other at probe results for signs of content
//! corruption. Reasons keep their discovery order and never repeat.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::probe::{ProbeEngine, ProbeReport};
use crate::records::FileRecord;

/// Byte sequences that show up when UTF-8 or Shift_JIS text has been
/// decoded with the wrong codec.
static MOJIBAKE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "Ã[\u{0080}-\u{00BF}]|Â[\u{0080}-\u{00BF}]|ãƒ|ã[\u{0081}-\u{0084}]|[åæç][\u{0080}-\u{00BF}]",
    )
    .expect("mojibake pattern is valid")
});

static CJK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[\u{3040}-\u{30ff}\u{3400}-\u{4dbf}\u{4e00}-\u{9fff}]")
        .expect("cjk pattern is valid")
});

/// Flags file names that look like the victims of a bad encoding
/// conversion.
pub fn detect_name_anomalies(name: &str) -> Vec<String> {
    let mut reasons = Vec::new();
    if name.is_empty() {
        return reasons;
    }

    if name.contains('\u{FFFD}') {
        push_unique(&mut reasons, "name contains the replacement character (\u{FFFD})");
    }

    let has_control = name
        .chars()
        .any(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'));
    if has_control {
        push_unique(&mut reasons, "name contains control characters");
    }

    if MOJIBAKE_PATTERN.is_match(name) {
        push_unique(
            &mut reasons,
            "name matches a mojibake pattern (\u{00C3}, \u{00C2}, \u{00E3})",
        );
    }

    let total = name.chars().count();
    let extended = name
        .chars()
        .filter(|ch| ('\u{0080}'..='\u{00FF}').contains(ch))
        .count();
    if extended > 0 {
        let ratio = extended as f64 / total.max(1) as f64;
        if ratio > 0.6 && !CJK_PATTERN.is_match(name) {
            push_unique(
                &mut reasons,
                "name is mostly extended ASCII, original encoding may be lost",
            );
        }
    }

    if name.contains("??") {
        push_unique(
            &mut reasons,
            "name contains consecutive question marks, possible encoding failure",
        );
    }

    reasons
}

/// Flags files whose probe results suggest the content is unreadable or
/// damaged. Checks are scoped to the engine that actually ran, so a
/// missing external tool never marks files as corrupt.
pub fn detect_content_anomalies(
    record: &FileRecord,
    report: &ProbeReport,
    hash_attempted: bool,
) -> Vec<String> {
    let mut reasons = Vec::new();

    for error in &report.errors {
        push_unique(&mut reasons, &format!("analysis error: {}", error));
    }

    if record.size_bytes == 0 {
        push_unique(&mut reasons, "file size is 0 bytes");
    }

    if hash_attempted && record.content_hash.is_none() {
        push_unique(&mut reasons, "content hash could not be computed");
    }

    if record.size_bytes > 0 {
        match report.engine {
            ProbeEngine::Audio => {
                if record.attr_f64("duration").is_none() {
                    push_unique(&mut reasons, "audio duration could not be read");
                }
            }
            ProbeEngine::Video => {
                let has_resolution =
                    record.attr_i64("width").is_some() && record.attr_i64("height").is_some();
                if !has_resolution {
                    push_unique(&mut reasons, "video resolution could not be read");
                }
                if record.attr_f64("duration").is_none() {
                    push_unique(&mut reasons, "video duration could not be read");
                }
            }
            ProbeEngine::Image => {
                let has_dimensions =
                    record.attr_i64("width").is_some() && record.attr_i64("height").is_some();
                if !has_dimensions {
                    push_unique(&mut reasons, "image dimensions could not be read");
                }
            }
            _ => {}
        }
    }

    reasons
}

fn push_unique(reasons: &mut Vec<String>, reason: &str) {
    if !reasons.iter().any(|r| r == reason) {
        reasons.push(reason.to_string());
    }
}
