//! External `ffprobe` invocation for video metadata.

use once_cell::sync::Lazy;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

static FFPROBE_AVAILABLE: Lazy<bool> = Lazy::new(|| {
    let available = Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !available {
        tracing::info!("ffprobe not found; video metadata extraction disabled");
    }
    available
});

/// Whether ffprobe is on the PATH. Checked once per process.
pub fn available() -> bool {
    *FFPROBE_AVAILABLE
}

/// Runs `ffprobe -print_format json -show_format -show_streams` on a file,
/// killing the process if it exceeds the probe timeout.
pub fn run(path: &Path) -> Result<serde_json::Value, String> {
    let mut child = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to run ffprobe: {}", e))?;

    // Drain pipes on their own threads so a chatty child cannot block on a
    // full pipe while we poll for exit.
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + PROBE_TIMEOUT;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!(
                        "ffprobe timed out after {}s on {}",
                        PROBE_TIMEOUT.as_secs(),
                        path.display()
                    ));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(format!("Failed to wait for ffprobe: {}", e)),
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            stderr.trim()
        ));
    }

    serde_json::from_str(&stdout)
        .map_err(|e| format!("Failed to parse ffprobe output for {}: {}", path.display(), e))
}
