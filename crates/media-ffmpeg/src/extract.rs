use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::process::run_to_completion;
use crate::time::{format_seconds, validate_seconds};

/// Down-sample chain used for hover clips: 10 fps, 320 px wide.
pub const CLIP_FILTER_CHAIN: &str = "fps=10,scale=320:-1:flags=lanczos";

/// Writes a single frame at `at_seconds` to `output` (format from extension).
///
/// The seek is placed before `-i`, so it lands on the nearest decodable frame
/// the demuxer offers. An existing file at `output` is overwritten.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::extract_still;
///
/// extract_still("sample.mp4", 9.1, "cp_1_before.jpg").expect("extract should succeed");
/// ```
pub fn extract_still(
    input: impl AsRef<Path>,
    at_seconds: f64,
    output: impl AsRef<Path>,
) -> Result<()> {
    let at_seconds = validate_seconds(at_seconds)?;

    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-y", "-ss"])
        .arg(format_seconds(at_seconds))
        .arg("-i")
        .arg(input.as_ref())
        .args(["-frames:v", "1", "-q:v", "2"])
        .arg(output.as_ref());

    run_to_completion(&mut command, "run ffmpeg extract still")?;
    Ok(())
}

/// Writes a looping animated clip covering `[start_seconds, start_seconds + duration_seconds)`.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::extract_clip;
///
/// extract_clip("sample.mp4", 8.1, 2.0, "cp_1_anim_before.gif").expect("extract should succeed");
/// ```
pub fn extract_clip(
    input: impl AsRef<Path>,
    start_seconds: f64,
    duration_seconds: f64,
    output: impl AsRef<Path>,
) -> Result<()> {
    let start_seconds = validate_seconds(start_seconds)?;
    let duration_seconds = validate_seconds(duration_seconds)?;

    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-y", "-ss"])
        .arg(format_seconds(start_seconds))
        .arg("-t")
        .arg(format_seconds(duration_seconds))
        .arg("-i")
        .arg(input.as_ref())
        .args(["-vf", CLIP_FILTER_CHAIN, "-an", "-loop", "0"])
        .arg(output.as_ref());

    run_to_completion(&mut command, "run ffmpeg extract clip")?;
    Ok(())
}
