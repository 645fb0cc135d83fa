//! Geometry statistics for 3D model files.
//!
//! OBJ, STL, and PLY carry their structure in plain headers or fixed-size
//! records, so counts come straight from the file without a mesh library.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::records::{AttrMap, Value};

pub(crate) fn extract(path: &Path, extension: &str) -> Result<AttrMap, String> {
    match extension {
        ".obj" => extract_obj(path),
        ".stl" => extract_stl(path),
        ".ply" => extract_ply(path),
        _ => Ok(AttrMap::new()),
    }
}

fn open_reader(path: &Path) -> Result<BufReader<File>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open model {}: {}", path.display(), e))?;
    Ok(BufReader::new(file))
}

fn extract_obj(path: &Path) -> Result<AttrMap, String> {
    let reader = open_reader(path)?;
    let mut vertices = 0i64;
    let mut faces = 0i64;
    let mut triangles = 0i64;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim_start();
        if line.starts_with("v ") {
            vertices += 1;
        } else if let Some(rest) = line.strip_prefix("f ") {
            faces += 1;
            if rest.split_whitespace().count() == 3 {
                triangles += 1;
            }
        }
    }

    let mut attrs = AttrMap::new();
    attrs.insert("format".to_string(), Value::Text("obj".to_string()));
    attrs.insert("vertices".to_string(), Value::Int(vertices));
    attrs.insert("faces".to_string(), Value::Int(faces));
    attrs.insert("triangles".to_string(), Value::Int(triangles));
    Ok(attrs)
}

/// Binary STL is an 80-byte header, a u32 triangle count, then 50 bytes
/// per triangle. Anything that fails that size check is treated as ASCII.
fn extract_stl(path: &Path) -> Result<AttrMap, String> {
    let file_size = std::fs::metadata(path)
        .map_err(|e| format!("Failed to stat model {}: {}", path.display(), e))?
        .len();
    let mut reader = open_reader(path)?;

    let mut header = [0u8; 84];
    let mut attrs = AttrMap::new();
    if reader.read_exact(&mut header).is_ok() {
        let count = u32::from_le_bytes([header[80], header[81], header[82], header[83]]);
        if 84 + 50 * u64::from(count) == file_size {
            attrs.insert("format".to_string(), Value::Text("stl_binary".to_string()));
            attrs.insert("triangles".to_string(), Value::Int(i64::from(count)));
            attrs.insert("faces".to_string(), Value::Int(i64::from(count)));
            attrs.insert("vertices".to_string(), Value::Int(i64::from(count) * 3));
            return Ok(attrs);
        }
    }

    let mut reader = open_reader(path)?;
    let mut triangles = 0i64;
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                if line.trim_start().starts_with("facet") {
                    triangles += 1;
                }
            }
            Err(_) => break,
        }
    }
    attrs.insert("format".to_string(), Value::Text("stl_ascii".to_string()));
    attrs.insert("triangles".to_string(), Value::Int(triangles));
    attrs.insert("faces".to_string(), Value::Int(triangles));
    attrs.insert("vertices".to_string(), Value::Int(triangles * 3));
    Ok(attrs)
}

fn extract_ply(path: &Path) -> Result<AttrMap, String> {
    let reader = open_reader(path)?;
    let mut attrs = AttrMap::new();
    attrs.insert("format".to_string(), Value::Text("ply".to_string()));
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        if line == "end_header" {
            break;
        }
        let mut parts = line.split_whitespace();
        if parts.next() != Some("element") {
            continue;
        }
        let kind = parts.next();
        let count = parts.next().and_then(|n| n.parse::<i64>().ok());
        match (kind, count) {
            (Some("vertex"), Some(n)) => {
                attrs.insert("vertices".to_string(), Value::Int(n));
            }
            (Some("face"), Some(n)) => {
                attrs.insert("faces".to_string(), Value::Int(n));
            }
            _ => {}
        }
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extract_obj() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "v 0.0 0.0 0.0").unwrap();
        writeln!(file, "v 1.0 0.0 0.0").unwrap();
        writeln!(file, "v 0.0 1.0 0.0").unwrap();
        writeln!(file, "vn 0.0 0.0 1.0").unwrap();
        writeln!(file, "f 1 2 3").unwrap();
        writeln!(file, "f 1/1 2/2 3/3 1/1").unwrap();

        let attrs = extract(&path, ".obj").unwrap();
        assert_eq!(attrs.get("vertices"), Some(&Value::Int(3)));
        assert_eq!(attrs.get("faces"), Some(&Value::Int(2)));
        assert_eq!(attrs.get("triangles"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_extract_binary_stl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.stl");
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 100]);
        std::fs::write(&path, bytes).unwrap();

        let attrs = extract(&path, ".stl").unwrap();
        assert_eq!(attrs.get("format"), Some(&Value::Text("stl_binary".to_string())));
        assert_eq!(attrs.get("triangles"), Some(&Value::Int(2)));
        assert_eq!(attrs.get("vertices"), Some(&Value::Int(6)));
    }

    #[test]
    fn test_extract_ascii_stl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.stl");
        let body = "solid part\n  facet normal 0 0 1\n  endfacet\n  facet normal 0 0 1\n  endfacet\n  facet normal 0 0 1\n  endfacet\nendsolid part\n";
        std::fs::write(&path, body).unwrap();

        let attrs = extract(&path, ".stl").unwrap();
        assert_eq!(attrs.get("format"), Some(&Value::Text("stl_ascii".to_string())));
        assert_eq!(attrs.get("triangles"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_extract_ply_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.ply");
        let body = "ply\nformat ascii 1.0\nelement vertex 128\nproperty float x\nelement face 64\nend_header\nignored body\n";
        std::fs::write(&path, body).unwrap();

        let attrs = extract(&path, ".ply").unwrap();
        assert_eq!(attrs.get("vertices"), Some(&Value::Int(128)));
        assert_eq!(attrs.get("faces"), Some(&Value::Int(64)));
    }

    #[test]
    fn test_unhandled_extension() {
        let attrs = extract(Path::new("/nonexistent/mesh.fbx"), ".fbx").unwrap();
        assert!(attrs.is_empty());
    }
}
