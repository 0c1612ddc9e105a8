use std::path::Path;

use media_ffmpeg::{BlackDetectParams, SegmentSplitRequest};

/// External media operations required by the pipeline.
///
/// Every call blocks until the underlying process exits. Errors keep the
/// process-level detail so the engine can tell launch failures from
/// non-zero exits.
pub trait MediaBackend {
    /// Runs the black-frame analysis pass and returns its diagnostic text.
    fn detect_black_frames(
        &self,
        path: &Path,
        params: &BlackDetectParams,
    ) -> media_ffmpeg::Result<String>;

    /// Reads the container duration in seconds, if declared.
    fn probe_duration(&self, path: &Path) -> media_ffmpeg::Result<Option<f64>>;

    /// Writes one still frame taken at `at_seconds`.
    fn extract_still(&self, path: &Path, at_seconds: f64, output: &Path)
    -> media_ffmpeg::Result<()>;

    /// Writes a looping clip of `duration_seconds` starting at `start_seconds`.
    fn extract_clip(
        &self,
        path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> media_ffmpeg::Result<()>;

    /// Splits the input at the requested boundaries without re-encoding.
    fn split_segments(&self, request: &SegmentSplitRequest) -> media_ffmpeg::Result<()>;

    /// Copies the whole input without re-encoding.
    fn stream_copy(&self, input: &Path, output: &Path) -> media_ffmpeg::Result<()>;
}

/// FFmpeg CLI-backed backend used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegMediaBackend;

impl MediaBackend for FfmpegMediaBackend {
    fn detect_black_frames(
        &self,
        path: &Path,
        params: &BlackDetectParams,
    ) -> media_ffmpeg::Result<String> {
        media_ffmpeg::detect_black_frames(path, params)
    }

    fn probe_duration(&self, path: &Path) -> media_ffmpeg::Result<Option<f64>> {
        media_ffmpeg::probe_duration_seconds(path)
    }

    fn extract_still(
        &self,
        path: &Path,
        at_seconds: f64,
        output: &Path,
    ) -> media_ffmpeg::Result<()> {
        media_ffmpeg::extract_still(path, at_seconds, output)
    }

    fn extract_clip(
        &self,
        path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> media_ffmpeg::Result<()> {
        media_ffmpeg::extract_clip(path, start_seconds, duration_seconds, output)
    }

    fn split_segments(&self, request: &SegmentSplitRequest) -> media_ffmpeg::Result<()> {
        media_ffmpeg::split_segments(request)
    }

    fn stream_copy(&self, input: &Path, output: &Path) -> media_ffmpeg::Result<()> {
        media_ffmpeg::stream_copy(input, output)
    }
}
