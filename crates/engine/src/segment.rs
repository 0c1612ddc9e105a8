//! Split planning and execution.
//!
//! A plan is computed from the sorted boundary list alone, so every output
//! path is known before the external tool runs. Splitting is a stream copy:
//! cuts land on the nearest keyframe, not on the exact requested frame.

use std::fs;
use std::path::{Path, PathBuf};

use media_ffmpeg::SegmentSplitRequest;
use tracing::{debug, info, warn};

use crate::backend::MediaBackend;
use crate::config::state_io;
use crate::error::{EngineError, Result};

const MIN_INDEX_WIDTH: usize = 3;
const FALLBACK_EXTENSION: &str = "mp4";
const FALLBACK_STEM: &str = "video";

/// One output file of a split.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment {
    /// 1-based position, as written into the file name.
    pub index: u32,
    pub start: f64,
    /// `None` for the last segment when the media duration is unknown.
    pub end: Option<f64>,
    pub path: PathBuf,
}

/// Deterministic description of one split run.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    /// Internal boundaries, strictly ascending.
    pub boundaries: Vec<f64>,
    /// Requested times that did not become boundaries, ascending.
    pub dropped: Vec<f64>,
    pub segments: Vec<PlannedSegment>,
    stem: String,
    extension: String,
    index_width: usize,
}

/// Directory receiving split outputs for `source`: `<root>/<stem>_splits`.
pub fn split_output_dir(tasks_root: &Path, source: &Path) -> PathBuf {
    tasks_root.join(format!("{}_splits", source_stem(source)))
}

/// Plans a split of `source` at `times`.
///
/// Times are sorted and exact duplicates collapse. Boundaries at or before 0,
/// or at or past the known media duration, would produce empty segments and
/// are dropped; the plan lists them in `dropped` and a warning names them.
pub fn plan_segments(
    source: &Path,
    times: &[f64],
    output_dir: &Path,
    media_duration: Option<f64>,
) -> SegmentPlan {
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut boundaries: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut dropped = Vec::new();
    for time in sorted {
        let inside = time.is_finite()
            && time > 0.0
            && media_duration.is_none_or(|duration| time < duration);
        if inside && boundaries.last() != Some(&time) {
            boundaries.push(time);
        } else {
            dropped.push(time);
        }
    }
    if !dropped.is_empty() {
        warn!(
            source = ?source,
            ?dropped,
            ?media_duration,
            "cut points duplicated or outside the media, not used as split boundaries"
        );
    }

    let stem = source_stem(source);
    let extension = source
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned())
        .filter(|extension| !extension.is_empty())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    let count = boundaries.len() + 1;
    let index_width = MIN_INDEX_WIDTH.max(count.to_string().len());

    let mut plan = SegmentPlan {
        source: source.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        boundaries,
        dropped,
        segments: Vec::with_capacity(count),
        stem,
        extension,
        index_width,
    };

    let mut start = 0.0;
    for position in 0..count {
        let end = plan.boundaries.get(position).copied().or(media_duration);
        let index = position as u32 + 1;
        let path = plan.output_dir.join(plan.file_name(index));
        plan.segments.push(PlannedSegment {
            index,
            start,
            end,
            path,
        });
        if let Some(end) = end {
            start = end;
        }
    }
    plan
}

impl SegmentPlan {
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.segments
            .iter()
            .map(|segment| segment.path.clone())
            .collect()
    }

    /// Segment-muxer pattern matching the planned file names.
    pub fn output_pattern(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_part_%0{}d.{}",
            self.stem, self.index_width, self.extension
        ))
    }

    fn file_name(&self, index: u32) -> String {
        format!(
            "{}_part_{index:0width$}.{}",
            self.stem,
            self.extension,
            width = self.index_width
        )
    }

    /// Runs the plan: a single stream copy without boundaries, one
    /// segment-muxer run otherwise. Partial outputs of a failed run are
    /// left in place.
    pub fn execute<M: MediaBackend>(&self, media: &M) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)
            .map_err(state_io("create split output directory", &self.output_dir))?;

        let result = if self.boundaries.is_empty() {
            debug!(source = ?self.source, "no boundaries, copying whole source");
            media.stream_copy(&self.source, &self.segments[0].path)
        } else {
            media.split_segments(&SegmentSplitRequest {
                input: self.source.clone(),
                segment_times: self.boundaries.clone(),
                output_pattern: self.output_pattern(),
                start_number: 1,
            })
        };
        result.map_err(|error| EngineError::from_split(self.source.clone(), error))?;

        info!(
            source = ?self.source,
            output_dir = ?self.output_dir,
            segments = self.segments.len(),
            "split completed"
        );
        Ok(self.output_paths())
    }
}

/// Split outputs of `source` currently present in `output_dir`, by name.
pub fn list_split_outputs(output_dir: &Path, source: &Path) -> Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}_part_", source_stem(source));
    let entries =
        fs::read_dir(output_dir).map_err(state_io("read split output directory", output_dir))?;
    let mut outputs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(state_io("read split output directory", output_dir))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(&prefix));
        if matches && path.is_file() {
            outputs.push(path);
        }
    }
    outputs.sort();
    Ok(outputs)
}

fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::{list_split_outputs, plan_segments, split_output_dir};
    use crate::error::EngineError;
    use crate::testing::{MediaCall, MockBackend};

    #[test]
    fn plan_declares_n_plus_one_padded_outputs() {
        let plan = plan_segments(
            Path::new("/videos/movie.mp4"),
            &[50.15, 10.1],
            Path::new("/out"),
            Some(120.0),
        );

        assert_eq!(plan.boundaries, vec![10.1, 50.15]);
        assert_eq!(
            plan.output_paths(),
            vec![
                PathBuf::from("/out/movie_part_001.mp4"),
                PathBuf::from("/out/movie_part_002.mp4"),
                PathBuf::from("/out/movie_part_003.mp4"),
            ]
        );
        assert_eq!(plan.output_pattern(), PathBuf::from("/out/movie_part_%03d.mp4"));
        assert_eq!(plan.segments[1].start, 10.1);
        assert_eq!(plan.segments[1].end, Some(50.15));
        assert_eq!(plan.segments[2].end, Some(120.0));
    }

    #[test]
    fn empty_boundary_list_plans_a_single_output() {
        let plan = plan_segments(Path::new("clip.mkv"), &[], Path::new("/out"), None);

        assert_eq!(plan.output_paths(), vec![PathBuf::from("/out/clip_part_001.mkv")]);
        assert_eq!(plan.segments[0].end, None);
    }

    #[test]
    fn index_width_grows_past_three_digits() {
        let times: Vec<f64> = (1..=1000).map(f64::from).collect();

        let plan = plan_segments(Path::new("long.mp4"), &times, Path::new("/out"), None);

        assert_eq!(plan.segments.len(), 1001);
        assert_eq!(plan.segments[0].path, PathBuf::from("/out/long_part_0001.mp4"));
        assert_eq!(plan.output_pattern(), PathBuf::from("/out/long_part_%04d.mp4"));
    }

    #[test]
    fn degenerate_boundaries_are_dropped() {
        let plan = plan_segments(
            Path::new("movie"),
            &[0.0, 30.0, 30.0, 60.0, 90.0],
            Path::new("/out"),
            Some(60.0),
        );

        assert_eq!(plan.boundaries, vec![30.0]);
        assert_eq!(plan.dropped, vec![0.0, 30.0, 60.0, 90.0]);
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.segments[0].path, PathBuf::from("/out/movie_part_001.mp4"));
    }

    #[test]
    fn split_output_dir_uses_source_stem() {
        assert_eq!(
            split_output_dir(Path::new("/tasks"), Path::new("/videos/movie.mp4")),
            PathBuf::from("/tasks/movie_splits")
        );
    }

    #[test]
    fn execute_runs_one_segment_muxer_pass() {
        let dir = TempDir::new().expect("temp dir");
        let backend = MockBackend::new();
        let calls = backend.calls();
        let plan = plan_segments(
            Path::new("/videos/movie.mp4"),
            &[10.1, 50.15],
            &dir.path().join("movie_splits"),
            Some(120.0),
        );

        let outputs = plan.execute(&backend).expect("execute");

        assert_eq!(outputs.len(), 3);
        assert!(outputs.iter().all(|path| path.is_file()));
        let calls = calls.lock().expect("lock calls");
        let [MediaCall::Split(request)] = calls.as_slice() else {
            panic!("expected one split call, got {calls:?}");
        };
        assert_eq!(request.segment_times, vec![10.1, 50.15]);
        assert_eq!(request.start_number, 1);
    }

    #[test]
    fn execute_without_boundaries_copies_the_source() {
        let dir = TempDir::new().expect("temp dir");
        let backend = MockBackend::new();
        let calls = backend.calls();
        let plan = plan_segments(Path::new("/videos/movie.mp4"), &[], dir.path(), None);

        let outputs = plan.execute(&backend).expect("execute");

        assert_eq!(outputs, vec![dir.path().join("movie_part_001.mp4")]);
        assert!(matches!(
            calls.lock().expect("lock calls").as_slice(),
            [MediaCall::Copy { .. }]
        ));
    }

    #[test]
    fn failed_split_reports_captured_output() {
        let dir = TempDir::new().expect("temp dir");
        let backend = MockBackend::new().failing_split();
        let plan = plan_segments(Path::new("/videos/movie.mp4"), &[10.0], dir.path(), None);

        let error = plan.execute(&backend).expect_err("must fail");

        let EngineError::SplitFailure { output, .. } = error else {
            panic!("expected SplitFailure, got {error:?}");
        };
        assert!(output.contains("mock split failed"));
    }

    #[test]
    fn list_split_outputs_returns_matching_files_in_order() {
        let dir = TempDir::new().expect("temp dir");
        for name in ["movie_part_002.mp4", "movie_part_001.mp4", "other_part_001.mp4"] {
            std::fs::write(dir.path().join(name), b"x").expect("write output");
        }

        let outputs = list_split_outputs(dir.path(), Path::new("/videos/movie.mp4")).expect("list");

        assert_eq!(
            outputs,
            vec![
                dir.path().join("movie_part_001.mp4"),
                dir.path().join("movie_part_002.mp4"),
            ]
        );
        assert!(
            list_split_outputs(&dir.path().join("missing"), Path::new("movie.mp4"))
                .expect("list")
                .is_empty()
        );
    }
}
