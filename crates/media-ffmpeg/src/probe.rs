use std::path::Path;
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::process::run_to_completion;

/// Reads the container duration via `ffprobe`.
///
/// Returns `Ok(None)` when the container does not declare a duration.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::probe_duration_seconds;
///
/// let duration = probe_duration_seconds("sample.mp4").expect("probe should succeed");
/// assert!(duration.unwrap_or(0.0) >= 0.0);
/// ```
pub fn probe_duration_seconds(path: impl AsRef<Path>) -> Result<Option<f64>> {
    let path = path.as_ref();

    let mut command = Command::new("ffprobe");
    command
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ])
        .arg(path);

    let output = run_to_completion(&mut command, "run ffprobe duration probe")?;
    let stdout = String::from_utf8(output.stdout)?;
    parse_duration(&stdout)
}

fn parse_duration(raw: &str) -> Result<Option<f64>> {
    let value = raw.trim();
    if value.is_empty() || value == "N/A" {
        return Ok(None);
    }
    let duration = value.parse::<f64>().map_err(|_| MediaFfmpegError::Parse {
        context: "format duration seconds",
        value: value.to_string(),
    })?;
    Ok(Some(duration))
}
