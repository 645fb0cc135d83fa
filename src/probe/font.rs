//! Font identification from the sfnt/WOFF header bytes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::records::{AttrMap, Value};

const HEADER_BYTES: usize = 1024;

pub(crate) fn extract(path: &Path, extension: &str) -> Result<AttrMap, String> {
    let mut file = File::open(path)
        .map_err(|e| format!("Failed to open font {}: {}", path.display(), e))?;
    let mut header = vec![0u8; HEADER_BYTES];
    let read = file
        .read(&mut header)
        .map_err(|e| format!("Failed to read font {}: {}", path.display(), e))?;
    header.truncate(read);

    let mut attrs = AttrMap::new();
    let format = detect_format(&header).or_else(|| format_from_extension(extension));
    if let Some(format) = format {
        attrs.insert("format".to_string(), Value::Text(format.to_string()));
    }
    if let Some(tables) = table_count(&header) {
        attrs.insert("table_count".to_string(), Value::Int(i64::from(tables)));
    }

    let has_bold = contains_bytes(&header, b"Bold");
    let has_italic = contains_bytes(&header, b"Italic");
    let style = match (has_bold, has_italic) {
        (true, true) => "Bold Italic",
        (true, false) => "Bold",
        (false, true) => "Italic",
        (false, false) => "Regular",
    };
    attrs.insert("font_style".to_string(), Value::Text(style.to_string()));

    Ok(attrs)
}

fn detect_format(header: &[u8]) -> Option<&'static str> {
    if header.len() < 4 {
        return None;
    }
    match &header[..4] {
        [0x00, 0x01, 0x00, 0x00] | b"true" => Some("TrueType"),
        b"OTTO" => Some("OpenType"),
        b"wOFF" | b"wOF2" => Some("Web Font"),
        b"ttcf" => Some("TrueType Collection"),
        _ => None,
    }
}

fn format_from_extension(extension: &str) -> Option<&'static str> {
    match extension {
        ".ttf" => Some("TrueType"),
        ".otf" => Some("OpenType"),
        ".woff" | ".woff2" => Some("Web Font"),
        ".ttc" => Some("TrueType Collection"),
        _ => None,
    }
}

/// The table directory count lives at offset 4 in sfnt files and at
/// offset 12 in the WOFF header.
fn table_count(header: &[u8]) -> Option<u16> {
    let offset = match detect_format(header)? {
        "Web Font" => 12,
        "TrueType" | "OpenType" => 4,
        _ => return None,
    };
    let bytes = header.get(offset..offset + 2)?;
    let count = u16::from_be_bytes([bytes[0], bytes[1]]);
    if count == 0 {
        None
    } else {
        Some(count)
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_truetype_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.ttf");
        let mut bytes = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x0c];
        bytes.extend_from_slice(b"padding Bold padding");
        std::fs::write(&path, bytes).unwrap();

        let attrs = extract(&path, ".ttf").unwrap();
        assert_eq!(attrs.get("format"), Some(&Value::Text("TrueType".to_string())));
        assert_eq!(attrs.get("table_count"), Some(&Value::Int(12)));
        assert_eq!(attrs.get("font_style"), Some(&Value::Text("Bold".to_string())));
    }

    #[test]
    fn test_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.otf");
        std::fs::write(&path, b"not a real font").unwrap();

        let attrs = extract(&path, ".otf").unwrap();
        assert_eq!(attrs.get("format"), Some(&Value::Text("OpenType".to_string())));
        assert_eq!(attrs.get("font_style"), Some(&Value::Text("Regular".to_string())));
    }

    #[test]
    fn test_style_combination() {
        let header = b"wOFF....XXXX\x00\x08 Bold and Italic names";
        assert!(contains_bytes(header, b"Bold"));
        assert!(contains_bytes(header, b"Italic"));
        assert_eq!(table_count(header), Some(8));
    }
}
