use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::process::run_to_completion;
use crate::time::{format_seconds, validate_seconds};

/// Request payload for a segmented stream copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSplitRequest {
    pub input: PathBuf,
    /// Internal split boundaries in seconds, strictly ascending.
    pub segment_times: Vec<f64>,
    /// printf-style output pattern understood by the segment muxer,
    /// e.g. `out/movie_part_%03d.mp4`.
    pub output_pattern: PathBuf,
    /// Index given to the first output file.
    pub start_number: u32,
}

/// Splits `request.input` into `segment_times.len() + 1` files without
/// re-encoding.
///
/// Boundaries snap to keyframes, so segment edges may drift from the
/// requested times by up to one GOP.
pub fn split_segments(request: &SegmentSplitRequest) -> Result<()> {
    validate_request(request)?;

    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-y", "-i"])
        .arg(&request.input)
        .args(["-map", "0", "-c", "copy", "-f", "segment", "-segment_times"])
        .arg(segment_times_argument(&request.segment_times))
        .arg("-segment_start_number")
        .arg(request.start_number.to_string())
        .args(["-reset_timestamps", "1"])
        .arg(&request.output_pattern);

    run_to_completion(&mut command, "run ffmpeg segment split")?;
    Ok(())
}

/// Copies every stream of `input` into `output` without re-encoding.
pub fn stream_copy(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-y", "-i"])
        .arg(input.as_ref())
        .args(["-map", "0", "-c", "copy"])
        .arg(output.as_ref());

    run_to_completion(&mut command, "run ffmpeg stream copy")?;
    Ok(())
}

fn validate_request(request: &SegmentSplitRequest) -> Result<()> {
    if request.segment_times.is_empty() {
        return Err(MediaFfmpegError::InvalidSegmentTimes {
            reason: "at least one boundary is required",
        });
    }

    let mut previous = None;
    for &time in &request.segment_times {
        validate_seconds(time)?;
        if previous.is_some_and(|previous| time <= previous) {
            return Err(MediaFfmpegError::InvalidSegmentTimes {
                reason: "boundaries must be strictly ascending",
            });
        }
        previous = Some(time);
    }

    Ok(())
}

fn segment_times_argument(times: &[f64]) -> String {
    times
        .iter()
        .map(|time| format_seconds(*time))
        .collect::<Vec<_>>()
        .join(",")
}
