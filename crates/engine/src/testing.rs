use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use media_ffmpeg::{BlackDetectParams, MediaFfmpegError, SegmentSplitRequest};

use crate::backend::MediaBackend;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MediaCall {
    Detect { path: PathBuf },
    Probe { path: PathBuf },
    Still { at: f64, output: PathBuf },
    Clip { start: f64, duration: f64, output: PathBuf },
    Split(SegmentSplitRequest),
    Copy { input: PathBuf, output: PathBuf },
}

/// Records every call; writes placeholder outputs when their directory exists.
#[derive(Debug, Clone)]
pub(crate) struct MockBackend {
    detect_log: Option<String>,
    duration: Option<f64>,
    failing_outputs: Vec<String>,
    fail_split: bool,
    calls: Arc<Mutex<Vec<MediaCall>>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            detect_log: Some(String::new()),
            duration: Some(120.0),
            failing_outputs: Vec::new(),
            fail_split: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_detect_log(mut self, log: &str) -> Self {
        self.detect_log = Some(log.to_string());
        self
    }

    /// Detection fails as if ffmpeg were not installed.
    pub(crate) fn without_ffmpeg(mut self) -> Self {
        self.detect_log = None;
        self
    }

    pub(crate) fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub(crate) fn fail_outputs_containing(mut self, fragment: &str) -> Self {
        self.failing_outputs.push(fragment.to_string());
        self
    }

    pub(crate) fn failing_split(mut self) -> Self {
        self.fail_split = true;
        self
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<MediaCall>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: MediaCall) {
        self.calls.lock().expect("lock media calls").push(call);
    }

    fn write_output(&self, output: &Path) -> media_ffmpeg::Result<()> {
        let name = output.to_string_lossy();
        if self
            .failing_outputs
            .iter()
            .any(|fragment| name.contains(fragment.as_str()))
        {
            return Err(mock_failure("mock extraction failed"));
        }
        if output.parent().is_some_and(Path::is_dir) {
            std::fs::write(output, b"mock").expect("write mock output");
        }
        Ok(())
    }
}

impl MediaBackend for MockBackend {
    fn detect_black_frames(
        &self,
        path: &Path,
        _params: &BlackDetectParams,
    ) -> media_ffmpeg::Result<String> {
        self.record(MediaCall::Detect {
            path: path.to_path_buf(),
        });
        self.detect_log.clone().ok_or_else(|| MediaFfmpegError::Io {
            context: "run ffmpeg blackdetect",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg"),
        })
    }

    fn probe_duration(&self, path: &Path) -> media_ffmpeg::Result<Option<f64>> {
        self.record(MediaCall::Probe {
            path: path.to_path_buf(),
        });
        Ok(self.duration)
    }

    fn extract_still(
        &self,
        _path: &Path,
        at_seconds: f64,
        output: &Path,
    ) -> media_ffmpeg::Result<()> {
        self.record(MediaCall::Still {
            at: at_seconds,
            output: output.to_path_buf(),
        });
        self.write_output(output)
    }

    fn extract_clip(
        &self,
        _path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> media_ffmpeg::Result<()> {
        self.record(MediaCall::Clip {
            start: start_seconds,
            duration: duration_seconds,
            output: output.to_path_buf(),
        });
        self.write_output(output)
    }

    fn split_segments(&self, request: &SegmentSplitRequest) -> media_ffmpeg::Result<()> {
        self.record(MediaCall::Split(request.clone()));
        if self.fail_split {
            return Err(mock_failure("mock split failed"));
        }

        let pattern = request.output_pattern.to_string_lossy().into_owned();
        let Some((head, tail)) = pattern.split_once("%0") else {
            return Ok(());
        };
        let Some((width, rest)) = tail.split_once('d') else {
            return Ok(());
        };
        let width: usize = width.parse().expect("pattern width");
        let count = request.segment_times.len() as u32 + 1;
        for index in request.start_number..request.start_number + count {
            self.write_output(Path::new(&format!("{head}{index:0width$}{rest}")))?;
        }
        Ok(())
    }

    fn stream_copy(&self, input: &Path, output: &Path) -> media_ffmpeg::Result<()> {
        self.record(MediaCall::Copy {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });
        if self.fail_split {
            return Err(mock_failure("mock copy failed"));
        }
        self.write_output(output)
    }
}

fn mock_failure(message: &str) -> MediaFfmpegError {
    MediaFfmpegError::Parse {
        context: "mock backend",
        value: message.to_string(),
    }
}
