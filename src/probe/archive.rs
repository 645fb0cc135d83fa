//! Archive inspection. ZIP files get a real entry walk; other archive
//! formats are labeled by extension only.

use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use crate::records::{AttrMap, Value};

pub(crate) fn extract(path: &Path, extension: &str) -> Result<AttrMap, String> {
    if extension == ".zip" {
        return extract_zip(path);
    }

    let mut attrs = AttrMap::new();
    let label = extension.trim_start_matches('.').to_uppercase();
    if !label.is_empty() {
        attrs.insert("archive_type".to_string(), Value::Text(label));
    }
    Ok(attrs)
}

fn extract_zip(path: &Path) -> Result<AttrMap, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open archive {}: {}", path.display(), e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("Failed to read archive {}: {}", path.display(), e))?;

    let mut file_count = 0i64;
    let mut uncompressed = 0u64;
    let mut compressed = 0u64;
    let mut encrypted = false;
    for index in 0..archive.len() {
        let entry = match archive.by_index_raw(index) {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry.is_dir() {
            continue;
        }
        file_count += 1;
        uncompressed += entry.size();
        compressed += entry.compressed_size();
        encrypted |= entry.encrypted();
    }

    let mut attrs = AttrMap::new();
    attrs.insert("archive_type".to_string(), Value::Text("ZIP".to_string()));
    attrs.insert("file_count".to_string(), Value::Int(file_count));
    attrs.insert(
        "uncompressed_size".to_string(),
        Value::Int(uncompressed.min(i64::MAX as u64) as i64),
    );
    attrs.insert(
        "has_encryption".to_string(),
        Value::Int(i64::from(encrypted)),
    );
    if uncompressed > 0 {
        let ratio = (1.0 - compressed as f64 / uncompressed as f64) * 100.0;
        attrs.insert(
            "compression_ratio".to_string(),
            Value::Float((ratio * 10.0).round() / 10.0),
        );
    }

    let comment = String::from_utf8_lossy(archive.comment());
    let comment = comment.trim();
    if !comment.is_empty() {
        attrs.insert("comment".to_string(), Value::Text(comment.to_string()));
    }

    Ok(attrs)
}
