use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use media_ffmpeg::MediaFfmpegError;

use crate::cut_point::ArtifactKind;
use crate::task::TaskStatus;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and pipeline stages.
#[derive(Debug)]
pub enum EngineError {
    TaskNotFound {
        task_id: String,
    },
    CutPointNotFound {
        cut_point_id: String,
    },
    TaskBusy {
        task_id: String,
        status: TaskStatus,
    },
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    InvalidTime {
        time: f64,
    },
    InvalidSourcePath(PathBuf),
    /// The analysis tool could not be started.
    ProbeLaunchFailure {
        path: PathBuf,
        source: MediaFfmpegError,
    },
    /// The analysis tool exited with a non-zero status.
    ProbeFailure {
        path: PathBuf,
        exit_code: Option<i32>,
        output: String,
    },
    ArtifactExtractionFailure {
        cut_point_id: String,
        artifact: ArtifactKind,
        source: MediaFfmpegError,
    },
    SplitFailure {
        path: PathBuf,
        exit_code: Option<i32>,
        output: String,
    },
    StateCorruption {
        path: PathBuf,
        source: serde_json::Error,
    },
    StateIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    StateSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    Media(MediaFfmpegError),
}

impl EngineError {
    /// Classifies a failed black-frame analysis run.
    pub(crate) fn from_probe(path: PathBuf, error: MediaFfmpegError) -> Self {
        if error.is_launch_failure() {
            return Self::ProbeLaunchFailure {
                path,
                source: error,
            };
        }
        match error {
            MediaFfmpegError::CommandFailed { status, stderr, .. } => Self::ProbeFailure {
                path,
                exit_code: status.code(),
                output: stderr,
            },
            other => Self::Media(other),
        }
    }

    /// Wraps any failure of the split invocation, keeping its diagnostics.
    pub(crate) fn from_split(path: PathBuf, error: MediaFfmpegError) -> Self {
        let exit_code = error.exit_code();
        let output = error
            .captured_output()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        Self::SplitFailure {
            path,
            exit_code,
            output,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound { task_id } => write!(f, "task not found: {task_id}"),
            Self::CutPointNotFound { cut_point_id } => {
                write!(f, "cut point not found: {cut_point_id}")
            }
            Self::TaskBusy { task_id, status } => {
                write!(f, "task {task_id} is busy ({status})")
            }
            Self::InvalidTransition { task_id, from, to } => {
                write!(f, "task {task_id} cannot move from {from} to {to}")
            }
            Self::InvalidTime { time } => write!(f, "invalid cut point time: {time}"),
            Self::InvalidSourcePath(path) => {
                write!(f, "source video does not exist: {}", path.display())
            }
            Self::ProbeLaunchFailure { path, source } => write!(
                f,
                "black-frame analysis could not start for {}: {source}",
                path.display()
            ),
            Self::ProbeFailure {
                path,
                exit_code,
                output,
            } => write!(
                f,
                "black-frame analysis failed for {} (exit code {}): {}",
                path.display(),
                display_exit_code(*exit_code),
                output.trim()
            ),
            Self::ArtifactExtractionFailure {
                cut_point_id,
                artifact,
                source,
            } => write!(
                f,
                "failed to extract {} preview for {cut_point_id}: {source}",
                artifact.label()
            ),
            Self::SplitFailure {
                path,
                exit_code,
                output,
            } => write!(
                f,
                "split failed for {} (exit code {}): {}",
                path.display(),
                display_exit_code(*exit_code),
                output.trim()
            ),
            Self::StateCorruption { path, source } => {
                write!(f, "task record is malformed at {} ({source})", path.display())
            }
            Self::StateIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::StateSerialization { path, source } => {
                write!(
                    f,
                    "task record serialization failed at {} ({source})",
                    path.display()
                )
            }
            Self::Media(err) => write!(f, "media backend error: {err}"),
        }
    }
}

fn display_exit_code(code: Option<i32>) -> String {
    code.map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ProbeLaunchFailure { source, .. } => Some(source),
            Self::ArtifactExtractionFailure { source, .. } => Some(source),
            Self::StateCorruption { source, .. } => Some(source),
            Self::StateIo { source, .. } => Some(source),
            Self::StateSerialization { source, .. } => Some(source),
            Self::Media(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MediaFfmpegError> for EngineError {
    fn from(value: MediaFfmpegError) -> Self {
        Self::Media(value)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use media_ffmpeg::MediaFfmpegError;

    use super::EngineError;

    #[test]
    fn missing_executable_is_a_probe_launch_failure() {
        let error = EngineError::from_probe(
            PathBuf::from("movie.mp4"),
            MediaFfmpegError::Io {
                context: "run ffmpeg blackdetect",
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg"),
            },
        );

        assert!(matches!(error, EngineError::ProbeLaunchFailure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_probe_failure_with_output() {
        use std::os::unix::process::ExitStatusExt;

        let error = EngineError::from_probe(
            PathBuf::from("movie.mp4"),
            MediaFfmpegError::CommandFailed {
                command: "ffmpeg".to_string(),
                status: std::process::ExitStatus::from_raw(1 << 8),
                stderr: "movie.mp4: No such file or directory".to_string(),
            },
        );

        let EngineError::ProbeFailure {
            exit_code, output, ..
        } = &error
        else {
            panic!("expected ProbeFailure, got {error:?}");
        };
        assert_eq!(*exit_code, Some(1));
        assert!(output.contains("No such file"));
        assert!(error.to_string().contains("No such file"));
    }

    #[test]
    fn split_failure_keeps_message_when_nothing_was_captured() {
        let error = EngineError::from_split(
            PathBuf::from("movie.mp4"),
            MediaFfmpegError::InvalidSegmentTimes {
                reason: "boundaries must be strictly ascending",
            },
        );

        let EngineError::SplitFailure { output, .. } = error else {
            panic!("expected SplitFailure");
        };
        assert!(output.contains("strictly ascending"));
    }
}
