//! Append-only operation logs.
//!
//! Jobs collect timestamped lines in memory and write them out once at
//! the end. Logging is best-effort; a failed write never fails the job
//! that produced it.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use tracing::warn;

#[derive(Debug)]
pub struct OperationLog {
    prefix: String,
    dir: Option<PathBuf>,
    entries: Vec<String>,
}

impl OperationLog {
    /// `dir` of `None` keeps the log in memory only.
    pub fn new(prefix: impl Into<String>, dir: Option<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            dir,
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, message: impl AsRef<str>) {
        let timestamp = Local::now().format("%H:%M:%S");
        self.entries
            .push(format!("[{}] {}", timestamp, message.as_ref()));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Appends the untimestamped summary line and writes the log file,
    /// returning its path. Returns None when no directory is configured
    /// or the write fails.
    pub fn finalize(mut self, summary: impl Into<String>) -> Option<PathBuf> {
        self.entries.push(summary.into());

        let dir = self.dir.as_ref()?;
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create log directory");
            return None;
        }

        let path = dir.join(format!(
            "{}_{}.log",
            self.prefix,
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        match fs::write(&path, self.entries.join("\n")) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write operation log");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_timestamped() {
        let mut log = OperationLog::new("scan", None);
        log.append("scan start targets=2");
        log.append("ok /library/a.wav");

        assert_eq!(log.entries().len(), 2);
        for entry in log.entries() {
            // "[HH:MM:SS] ..."
            assert_eq!(entry.as_bytes()[0], b'[');
            assert_eq!(entry.as_bytes()[9], b']');
        }
        assert!(log.entries()[1].ends_with("ok /library/a.wav"));
    }

    #[test]
    fn test_finalize_writes_file_with_summary_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = OperationLog::new("scan", Some(dir.path().to_path_buf()));
        log.append("ok /library/a.wav");

        let path = log
            .finalize("status=completed total=1 processed=1 elapsed=0.10s")
            .unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("scan_"));

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "status=completed total=1 processed=1 elapsed=0.10s");
    }

    #[test]
    fn test_finalize_without_directory_returns_none() {
        let mut log = OperationLog::new("scan", None);
        log.append("ok /library/a.wav");
        assert!(log.finalize("status=completed").is_none());
    }

    #[test]
    fn test_finalize_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("deep");
        let log = OperationLog::new("batch", Some(nested.clone()));
        let path = log.finalize("status=empty").unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
