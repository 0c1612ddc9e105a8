use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::process::run_to_completion;
use crate::time::format_seconds;

/// Thresholds passed to FFmpeg's `blackdetect` filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackDetectParams {
    /// Minimum black interval length in seconds (`d`).
    pub min_duration: f64,
    /// Luminance ratio under which a pixel counts as black (`pix_th`).
    pub pixel_threshold: f64,
}

impl Default for BlackDetectParams {
    fn default() -> Self {
        Self {
            min_duration: 0.1,
            pixel_threshold: 0.10,
        }
    }
}

impl BlackDetectParams {
    /// Video filter expression for these thresholds.
    ///
    /// # Example
    /// ```
    /// use media_ffmpeg::BlackDetectParams;
    ///
    /// let filter = BlackDetectParams::default().filter_expression();
    /// assert_eq!(filter, "blackdetect=d=0.1:pix_th=0.1");
    /// ```
    pub fn filter_expression(&self) -> String {
        format!(
            "blackdetect=d={}:pix_th={}",
            format_seconds(self.min_duration),
            format_seconds(self.pixel_threshold)
        )
    }
}

/// Runs a video-only black-frame analysis pass and returns FFmpeg's full
/// diagnostic stream.
///
/// The filter reports intervals on stderr, so stderr is the payload here. A
/// non-zero exit yields `CommandFailed` with the captured text; a missing
/// executable yields `Io`.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::{BlackDetectParams, detect_black_frames};
///
/// let log = detect_black_frames("sample.mp4", &BlackDetectParams::default())
///     .expect("analysis should succeed");
/// assert!(log.contains("blackdetect") || log.is_empty());
/// ```
pub fn detect_black_frames(path: impl AsRef<Path>, params: &BlackDetectParams) -> Result<String> {
    let path = path.as_ref();

    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-nostats", "-i"])
        .arg(path)
        .arg("-vf")
        .arg(params.filter_expression())
        .args(["-an", "-f", "null", "-"]);

    let output = run_to_completion(&mut command, "run ffmpeg blackdetect")?;

    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
}
