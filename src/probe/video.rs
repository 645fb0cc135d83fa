//! Video metadata extraction via the external ffprobe tool.

use std::path::Path;

use super::ffprobe;
use crate::records::{AttrMap, Value};

pub(crate) fn extract(path: &Path) -> Result<AttrMap, String> {
    let data = ffprobe::run(path)?;
    Ok(parse_ffprobe_output(&data))
}

fn parse_ffprobe_output(data: &serde_json::Value) -> AttrMap {
    let mut attrs = AttrMap::new();

    if let Some(format) = data.get("format") {
        if let Some(duration) = str_field_f64(format, "duration") {
            attrs.insert("duration".to_string(), Value::Float(duration));
        }
        if let Some(container) = format.get("format_name").and_then(|v| v.as_str()) {
            attrs.insert("container".to_string(), Value::Text(container.to_string()));
        }
        if let Some(bit_rate) = str_field_f64(format, "bit_rate") {
            attrs.insert("bitrate".to_string(), Value::Int((bit_rate / 1000.0) as i64));
        }
    }

    if let Some(streams) = data.get("streams").and_then(|v| v.as_array()) {
        for stream in streams {
            match stream.get("codec_type").and_then(|v| v.as_str()) {
                Some("video") if !attrs.contains_key("width") => {
                    if let Some(width) = stream.get("width").and_then(|v| v.as_i64()) {
                        attrs.insert("width".to_string(), Value::Int(width));
                    }
                    if let Some(height) = stream.get("height").and_then(|v| v.as_i64()) {
                        attrs.insert("height".to_string(), Value::Int(height));
                    }
                    if let Some(codec) = stream.get("codec_name").and_then(|v| v.as_str()) {
                        attrs.insert("video_codec".to_string(), Value::Text(codec.to_string()));
                    }
                    let fps = stream
                        .get("avg_frame_rate")
                        .and_then(|v| v.as_str())
                        .and_then(parse_rational);
                    if let Some(fps) = fps {
                        attrs.insert("fps".to_string(), Value::Float(fps));
                    }
                }
                Some("audio") if !attrs.contains_key("audio_codec") => {
                    if let Some(codec) = stream.get("codec_name").and_then(|v| v.as_str()) {
                        attrs.insert("audio_codec".to_string(), Value::Text(codec.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    attrs
}

/// ffprobe encodes numbers as strings in its JSON output.
fn str_field_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
}

/// Parses frame rates like `30000/1001`; `0/0` means unknown.
fn parse_rational(raw: &str) -> Option<f64> {
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("24"), Some(24.0));
        assert_eq!(parse_rational("garbage"), None);
        let ntsc = parse_rational("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_ffprobe_output() {
        let payload = serde_json::json!({
            "format": {
                "duration": "120.50",
                "format_name": "matroska,webm",
                "bit_rate": "4000000"
            },
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920,
                 "height": 1080, "avg_frame_rate": "30000/1001"},
                {"codec_type": "audio", "codec_name": "aac"}
            ]
        });

        let attrs = parse_ffprobe_output(&payload);
        assert_eq!(attrs.get("duration"), Some(&Value::Float(120.5)));
        assert_eq!(
            attrs.get("container"),
            Some(&Value::Text("matroska,webm".to_string()))
        );
        assert_eq!(attrs.get("bitrate"), Some(&Value::Int(4000)));
        assert_eq!(attrs.get("width"), Some(&Value::Int(1920)));
        assert_eq!(attrs.get("height"), Some(&Value::Int(1080)));
        assert_eq!(attrs.get("video_codec"), Some(&Value::Text("h264".to_string())));
        assert_eq!(attrs.get("audio_codec"), Some(&Value::Text("aac".to_string())));
        let fps = attrs.get("fps").and_then(|v| v.as_f64()).unwrap();
        assert!((fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_ffprobe_output_missing_sections() {
        let attrs = parse_ffprobe_output(&serde_json::json!({}));
        assert!(attrs.is_empty());

        let attrs = parse_ffprobe_output(&serde_json::json!({
            "format": {"format_name": "mp4"},
            "streams": []
        }));
        assert_eq!(attrs.get("container"), Some(&Value::Text("mp4".to_string())));
        assert!(!attrs.contains_key("duration"));
    }
}
