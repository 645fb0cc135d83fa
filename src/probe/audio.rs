//! Audio metadata extraction via lofty.

use lofty::config::ParseOptions;
use lofty::file::FileType;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;

use crate::records::{AttrMap, Value};

pub(crate) fn extract(path: &Path) -> Result<AttrMap, String> {
    let tagged_file = Probe::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?
        .options(ParseOptions::new().read_properties(true))
        .read()
        .map_err(|e| format!("Failed to read audio metadata from {}: {}", path.display(), e))?;

    let mut attrs = AttrMap::new();
    attrs.insert("format".to_string(), Value::Text(format_name(tagged_file.file_type())));

    let properties = tagged_file.properties();
    let duration = properties.duration().as_secs_f64();
    attrs.insert(
        "duration".to_string(),
        if duration > 0.0 {
            Value::Float(duration)
        } else {
            Value::Absent
        },
    );
    attrs.insert(
        "sample_rate".to_string(),
        Value::from_opt(properties.sample_rate()),
    );
    attrs.insert(
        "channels".to_string(),
        Value::from_opt(properties.channels().map(u32::from)),
    );
    attrs.insert(
        "bitrate".to_string(),
        Value::from_opt(properties.audio_bitrate()),
    );
    if let Some(depth) = properties.bit_depth() {
        attrs.insert("bit_depth".to_string(), Value::Int(depth as i64));
    }

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        if let Some(artist) = tag.artist() {
            attrs.insert("artist".to_string(), Value::Text(artist.to_string()));
        }
        if let Some(title) = tag.title() {
            attrs.insert("title".to_string(), Value::Text(title.to_string()));
        }
        if let Some(album) = tag.album() {
            attrs.insert("album".to_string(), Value::Text(album.to_string()));
        }
        if let Some(genre) = tag.genre() {
            attrs.insert("genre".to_string(), Value::Text(genre.to_string()));
        }
        if let Some(year) = tag.year() {
            attrs.insert("year".to_string(), Value::Int(year as i64));
        }
    }

    Ok(attrs)
}

fn format_name(file_type: FileType) -> String {
    match file_type {
        FileType::Mpeg => "mp3".to_string(),
        FileType::Flac => "flac".to_string(),
        FileType::Wav => "wav".to_string(),
        FileType::Aac => "aac".to_string(),
        FileType::Mp4 => "mp4".to_string(),
        FileType::Vorbis => "ogg".to_string(),
        FileType::Opus => "opus".to_string(),
        FileType::Aiff => "aiff".to_string(),
        FileType::Ape => "ape".to_string(),
        FileType::WavPack => "wavpack".to_string(),
        FileType::Speex => "speex".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        let result = extract(Path::new("/nonexistent/track.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_format_name_maps_common_types() {
        assert_eq!(format_name(FileType::Mpeg), "mp3");
        assert_eq!(format_name(FileType::Vorbis), "ogg");
        assert_eq!(format_name(FileType::Flac), "flac");
    }
}
