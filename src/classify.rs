//! Category detection and classification axes.
//!
//! Detection maps an extension (with a MIME-prefix fallback) to a coarse
//! [`Category`] once per file. Classification maps an enriched record to a
//! bucket key per axis: the universal `primary`, `size`, `extension`,
//! `date`, and `age` axes plus category-specific axes. Missing attributes
//! land in the axis's `*_unknown` bucket; classification never fails.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::records::{Category, FileRecord, extension_of};

const AUDIO_EXTENSIONS: &[&str] = &[
    ".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a", ".aiff", ".ape", ".ac3", ".dts",
    ".opus", ".ra", ".au", ".snd", ".mka",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".webm", ".m4v", ".3gp", ".flv", ".wmv", ".mpg", ".mpeg",
    ".m2v", ".vob", ".ts", ".mts", ".m2ts", ".f4v", ".asf", ".rmvb", ".rm", ".divx", ".xvid",
    ".ogv", ".mxf", ".dv",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".svg", ".raw", ".cr2",
    ".nef", ".arw", ".dng", ".heic", ".heif", ".ico", ".psd", ".ai", ".eps", ".xcf", ".tga",
    ".pcx", ".pbm", ".pgm", ".ppm", ".exr", ".hdr", ".jp2", ".j2k", ".avif",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".docm", ".xls", ".xlsx", ".xlsm", ".ppt", ".pptx", ".pptm", ".odt",
    ".ods", ".odp", ".rtf", ".txt", ".md", ".markdown", ".csv", ".json", ".xml", ".html", ".htm",
    ".tex", ".bib", ".epub", ".mobi", ".azw", ".fb2", ".djvu", ".chm", ".lit",
];

const MODEL3D_EXTENSIONS: &[&str] = &[
    ".obj", ".stl", ".ply", ".off", ".gltf", ".glb", ".fbx", ".dae", ".x3d", ".3ds", ".blend",
    ".ma", ".mb", ".c4d", ".max", ".lwo", ".3mf", ".amf", ".wrl", ".vrml", ".x", ".md2", ".md3",
    ".md5", ".ase", ".lxo", ".mesh", ".dxf", ".iges", ".igs", ".step", ".stp", ".dwg", ".skp",
    ".3dm",
];

const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".tgz", ".tbz2", ".txz", ".z", ".lz",
    ".lzma", ".cab", ".msi", ".deb", ".rpm", ".dmg", ".iso", ".img", ".bin", ".cue", ".nrg",
    ".mdf", ".cdi",
];

const FONT_EXTENSIONS: &[&str] = &[
    ".ttf", ".otf", ".woff", ".woff2", ".eot", ".fon", ".fnt", ".bdf", ".pcf", ".snf", ".pfb",
    ".pfm", ".afm", ".pfa", ".gsf", ".psf", ".dfont",
];

const DATA_EXTENSIONS: &[&str] = &[
    ".db", ".sqlite", ".sqlite3", ".mdb", ".accdb", ".dbf", ".dat", ".sav", ".por", ".xpt",
    ".rdata", ".rds", ".mat", ".h5", ".hdf5", ".nc", ".cdf", ".fits", ".parquet", ".arrow",
    ".avro", ".orc", ".feather",
];

const CONFIG_EXTENSIONS: &[&str] = &[
    ".ini", ".cfg", ".conf", ".config", ".properties", ".yaml", ".yml", ".toml", ".env", ".plist",
    ".reg", ".inf", ".desktop", ".service",
];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    ".exe", ".app", ".pkg", ".run", ".com", ".scr", ".dll", ".so", ".dylib", ".sys", ".drv",
    ".ocx",
];

/// Extension → category table. Earlier categories win for any extension
/// listed twice, so overlapping install formats stay with the archive probe.
static EXTENSION_CATEGORIES: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    let tables: [(&[&str], Category); 10] = [
        (AUDIO_EXTENSIONS, Category::Audio),
        (VIDEO_EXTENSIONS, Category::Video),
        (IMAGE_EXTENSIONS, Category::Image),
        (DOCUMENT_EXTENSIONS, Category::Document),
        (MODEL3D_EXTENSIONS, Category::Model3d),
        (ARCHIVE_EXTENSIONS, Category::Archive),
        (FONT_EXTENSIONS, Category::Font),
        (DATA_EXTENSIONS, Category::Data),
        (CONFIG_EXTENSIONS, Category::Config),
        (EXECUTABLE_EXTENSIONS, Category::Executable),
    ];

    let mut map = HashMap::new();
    for (extensions, category) in tables {
        for ext in extensions {
            map.entry(*ext).or_insert(category);
        }
    }
    map
});

/// Category for a lower-cased dotted extension, if the table knows it.
pub fn category_for_extension(ext: &str) -> Option<Category> {
    EXTENSION_CATEGORIES.get(ext).copied()
}

/// Detects the coarse category for a path without touching the file.
pub fn detect_category(path: &Path) -> Category {
    let ext = extension_of(path);
    if let Some(category) = category_for_extension(&ext) {
        return category;
    }

    match mime_guess::from_path(path).first() {
        Some(mime) => match mime.type_().as_str() {
            "audio" => Category::Audio,
            "video" => Category::Video,
            "image" => Category::Image,
            "text" => Category::Document,
            "font" => Category::Font,
            _ => Category::Other,
        },
        None => Category::Other,
    }
}

/// Classifies a record against the current wall clock.
pub fn classify(record: &FileRecord) -> BTreeMap<String, String> {
    classify_at(record, Local::now())
}

/// Classifies a record with an injected "now" for the date/age axes.
pub fn classify_at(record: &FileRecord, now: DateTime<Local>) -> BTreeMap<String, String> {
    let mut axes = BTreeMap::new();
    axes.insert(
        "primary".to_string(),
        format!("primary_{}", record.category),
    );
    axes.insert("size".to_string(), size_bucket(record.size_bytes).to_string());
    axes.insert(
        "extension".to_string(),
        extension_bucket(&record.extension).to_string(),
    );
    axes.insert("date".to_string(), date_bucket(record));
    axes.insert("age".to_string(), age_bucket(record, now).to_string());

    match record.category {
        Category::Audio => classify_audio(record, &mut axes),
        Category::Video => classify_video(record, &mut axes),
        Category::Image => classify_image(record, &mut axes),
        Category::Document => classify_document(record, &mut axes),
        Category::Model3d => classify_model3d(record, &mut axes),
        Category::Archive => classify_archive(record, &mut axes),
        _ => {}
    }

    axes
}

/// Universal size band over megabytes.
pub fn size_bucket(size_bytes: u64) -> &'static str {
    let mb = size_bytes as f64 / (1024.0 * 1024.0);
    if mb < 0.1 {
        "size_tiny"
    } else if mb < 1.0 {
        "size_very_small"
    } else if mb < 10.0 {
        "size_small"
    } else if mb < 100.0 {
        "size_medium"
    } else if mb < 1024.0 {
        "size_large"
    } else if mb < 5120.0 {
        "size_very_large"
    } else {
        "size_huge"
    }
}

fn extension_bucket(extension: &str) -> &'static str {
    let bare = extension.trim_start_matches('.');
    if bare.is_empty() {
        "ext_none"
    } else if bare.len() <= 3 {
        "ext_short"
    } else if bare.len() <= 6 {
        "ext_medium"
    } else {
        "ext_long"
    }
}

fn date_bucket(record: &FileRecord) -> String {
    match record.modified_datetime() {
        Some(dt) => dt.format("%Y-%m").to_string(),
        None => "date_unknown".to_string(),
    }
}

fn age_bucket(record: &FileRecord, now: DateTime<Local>) -> &'static str {
    let Some(modified) = record.modified_datetime() else {
        return "age_unknown";
    };
    let days = (now - modified).num_days();
    if days < 1 {
        "age_today"
    } else if days < 7 {
        "age_week"
    } else if days < 30 {
        "age_month"
    } else if days < 365 {
        "age_year"
    } else {
        "age_old"
    }
}

fn duration_bucket(seconds: Option<f64>) -> String {
    match seconds {
        None => "duration_unknown".to_string(),
        Some(s) if s < 30.0 => "duration_very_short".to_string(),
        Some(s) if s < 180.0 => "duration_short".to_string(),
        Some(s) if s < 600.0 => "duration_medium".to_string(),
        Some(s) if s < 1800.0 => "duration_long".to_string(),
        Some(_) => "duration_very_long".to_string(),
    }
}

fn classify_audio(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let format = record
        .attr_str("format")
        .map(str::to_lowercase)
        .unwrap_or_else(|| record.extension.trim_start_matches('.').to_string());
    let format_bucket = if format.contains("mp3") {
        "format_mp3"
    } else if format.contains("wav") {
        "format_wav"
    } else if format.contains("flac") {
        "format_flac"
    } else if format.contains("aac") || format.contains("m4a") || format.contains("mp4") {
        "format_aac"
    } else if format.contains("aiff") {
        "format_aiff"
    } else if format.contains("ogg") || format.contains("vorbis") {
        "format_ogg"
    } else {
        "format_other"
    };
    axes.insert("audio_format".to_string(), format_bucket.to_string());

    let samplerate = match record.attr_f64("sample_rate") {
        None => "samplerate_unknown".to_string(),
        Some(sr) if sr <= 22050.0 => "samplerate_low".to_string(),
        Some(sr) if sr <= 44100.0 => "samplerate_cd".to_string(),
        Some(sr) if sr <= 48000.0 => "samplerate_standard".to_string(),
        Some(sr) if sr <= 96000.0 => "samplerate_high".to_string(),
        Some(_) => "samplerate_very_high".to_string(),
    };
    axes.insert("audio_samplerate".to_string(), samplerate);

    let channels = match record.attr_i64("channels") {
        None => "channels_unknown".to_string(),
        Some(1) => "channels_mono".to_string(),
        Some(2) => "channels_stereo".to_string(),
        Some(n) if n > 2 => format!("channels_multichannel_{}", n),
        Some(_) => "channels_unknown".to_string(),
    };
    axes.insert("audio_channels".to_string(), channels);

    axes.insert(
        "audio_duration".to_string(),
        duration_bucket(record.attr_f64("duration")),
    );
}

fn classify_video(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let resolution = match record.attr_f64("height") {
        None => "resolution_unknown".to_string(),
        Some(h) if h <= 480.0 => "resolution_sd".to_string(),
        Some(h) if h <= 720.0 => "resolution_hd".to_string(),
        Some(h) if h <= 1080.0 => "resolution_fullhd".to_string(),
        Some(h) if h <= 1440.0 => "resolution_qhd".to_string(),
        Some(h) if h <= 2160.0 => "resolution_4k".to_string(),
        Some(_) => "resolution_8k_plus".to_string(),
    };
    axes.insert("video_resolution".to_string(), resolution);

    let aspect = match (record.attr_f64("width"), record.attr_f64("height")) {
        (Some(w), Some(h)) if h > 0.0 => {
            let ratio = w / h;
            if (ratio - 4.0 / 3.0).abs() < 0.1 {
                "aspect_4_3"
            } else if (ratio - 16.0 / 9.0).abs() < 0.1 {
                "aspect_16_9"
            } else if (ratio - 2.35).abs() < 0.1 {
                "aspect_cinema"
            } else if ratio < 1.2 {
                "aspect_square"
            } else {
                "aspect_other"
            }
        }
        _ => "aspect_unknown",
    };
    axes.insert("video_aspect".to_string(), aspect.to_string());

    let fps = match record.attr_f64("fps") {
        None => "fps_unknown",
        Some(f) if f <= 24.0 => "fps_cinema",
        Some(f) if f <= 30.0 => "fps_standard",
        Some(f) if f <= 60.0 => "fps_smooth",
        Some(_) => "fps_high_speed",
    };
    axes.insert("video_fps".to_string(), fps.to_string());

    let container = record
        .attr_str("container")
        .map(str::to_lowercase)
        .unwrap_or_else(|| record.extension.trim_start_matches('.').to_string());
    let container_bucket = if container.contains("mp4") {
        "container_mp4"
    } else if container.contains("avi") {
        "container_avi"
    } else if container.contains("mkv") || container.contains("matroska") {
        "container_mkv"
    } else if container.contains("mov") || container.contains("quicktime") {
        "container_mov"
    } else {
        "container_other"
    };
    axes.insert("video_container".to_string(), container_bucket.to_string());

    axes.insert(
        "video_duration".to_string(),
        duration_bucket(record.attr_f64("duration")),
    );
}

fn classify_image(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let format = record
        .attr_str("format")
        .map(str::to_lowercase)
        .unwrap_or_default();
    let format_bucket = if format.contains("jpeg") || format.contains("jpg") {
        "format_jpeg"
    } else if format.contains("png") {
        "format_png"
    } else if format.contains("gif") {
        "format_gif"
    } else if format.contains("bmp") {
        "format_bmp"
    } else if format.contains("tiff") || format.contains("tif") {
        "format_tiff"
    } else if format.contains("webp") {
        "format_webp"
    } else {
        "format_other"
    };
    axes.insert("image_format".to_string(), format_bucket.to_string());

    let pixels = match (record.attr_f64("width"), record.attr_f64("height")) {
        (Some(w), Some(h)) => Some(w * h),
        _ => None,
    };
    let size = match pixels {
        None => "size_unknown",
        Some(p) if p < 100_000.0 => "size_thumbnail",
        Some(p) if p < 1_000_000.0 => "size_small",
        Some(p) if p < 5_000_000.0 => "size_medium",
        Some(p) if p < 20_000_000.0 => "size_large",
        Some(_) => "size_huge",
    };
    axes.insert("image_size".to_string(), size.to_string());

    let color = match record.attr_str("color_mode") {
        None => "color_unknown",
        Some("L") | Some("LA") => "color_grayscale",
        Some("RGB") => "color_rgb",
        Some("RGBA") => "color_rgba",
        Some("CMYK") => "color_cmyk",
        Some(_) => "color_other",
    };
    axes.insert("image_color".to_string(), color.to_string());
}

fn classify_document(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let pages = match record.attr_i64("pages") {
        None => "pages_unknown",
        Some(1) => "pages_single",
        Some(p) if p <= 10 => "pages_short",
        Some(p) if p <= 50 => "pages_medium",
        Some(p) if p <= 200 => "pages_long",
        Some(_) => "pages_very_long",
    };
    axes.insert("document_pages".to_string(), pages.to_string());

    let length = match record.attr_i64("words") {
        None => "length_unknown",
        Some(w) if w < 500 => "length_short",
        Some(w) if w < 2000 => "length_medium",
        Some(w) if w < 10000 => "length_long",
        Some(_) => "length_very_long",
    };
    axes.insert("document_length".to_string(), length.to_string());

    let has_author = record.attr_str("author").map(|a| !a.is_empty()).unwrap_or(false);
    let has_title = record.attr_str("title").map(|t| !t.is_empty()).unwrap_or(false);
    let metadata = if has_author && has_title {
        "metadata_rich"
    } else if has_author || has_title {
        "metadata_partial"
    } else {
        "metadata_minimal"
    };
    axes.insert("document_metadata".to_string(), metadata.to_string());
}

fn classify_model3d(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let complexity = match record.attr_i64("vertices") {
        None => "complexity_unknown",
        Some(v) if v < 1_000 => "complexity_low",
        Some(v) if v < 10_000 => "complexity_medium",
        Some(v) if v < 100_000 => "complexity_high",
        Some(_) => "complexity_very_high",
    };
    axes.insert("model_complexity".to_string(), complexity.to_string());
}

fn classify_archive(record: &FileRecord, axes: &mut BTreeMap<String, String>) {
    let files = match record.attr_i64("file_count") {
        None => "files_unknown",
        Some(n) if n < 10 => "files_few",
        Some(n) if n < 100 => "files_some",
        Some(n) if n < 1000 => "files_many",
        Some(_) => "files_huge",
    };
    axes.insert("archive_files".to_string(), files.to_string());

    let compression = match record.attr_f64("compression_ratio") {
        None => "compression_unknown",
        Some(r) if r < 20.0 => "compression_low",
        Some(r) if r < 60.0 => "compression_medium",
        Some(_) => "compression_high",
    };
    axes.insert("archive_compression".to_string(), compression.to_string());
}
