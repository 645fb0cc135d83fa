//! Image metadata extraction.
//!
//! Reads dimensions, color mode, and format from the image header without
//! decoding pixel data, plus the capture date from EXIF when present.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{ColorType, ImageDecoder, ImageReader};

use crate::records::{AttrMap, Value};

pub(crate) fn extract(path: &Path) -> Result<AttrMap, String> {
    let reader = ImageReader::open(path)
        .map_err(|e| format!("Failed to open image {}: {}", path.display(), e))?
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image header {}: {}", path.display(), e))?;

    let format = reader.format();
    let decoder = reader
        .into_decoder()
        .map_err(|e| format!("Failed to decode image {}: {}", path.display(), e))?;

    let mut attrs = AttrMap::new();
    let (width, height) = decoder.dimensions();
    attrs.insert("width".to_string(), Value::Int(i64::from(width)));
    attrs.insert("height".to_string(), Value::Int(i64::from(height)));
    attrs.insert(
        "color_mode".to_string(),
        Value::Text(color_mode_name(decoder.color_type())),
    );
    if let Some(format) = format {
        attrs.insert(
            "format".to_string(),
            Value::Text(format!("{:?}", format).to_lowercase()),
        );
    }

    if let Some(captured) = read_capture_date(path) {
        attrs.insert("capture_date".to_string(), Value::Text(captured));
    }

    Ok(attrs)
}

fn color_mode_name(color: ColorType) -> String {
    let mode = match color {
        ColorType::L8 | ColorType::L16 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "other",
    };
    mode.to_string()
}

/// EXIF is best-effort. Files without it (or with a mangled block) just
/// produce no capture date.
fn read_capture_date(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .or_else(|| exif.get_field(exif::Tag::DateTime, exif::In::PRIMARY))?;
    let raw = field.display_value().to_string();
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}
