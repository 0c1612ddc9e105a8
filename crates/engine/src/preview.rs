use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backend::MediaBackend;
use crate::config::Settings;
use crate::cut_point::{ArtifactKind, ArtifactState, CutPoint};
use crate::error::{EngineError, Result};

/// Distance kept from the end of the media when the "after" still would
/// land past it.
const AFTER_STILL_END_MARGIN: f64 = 0.1;

/// Preview timing and parallelism.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOptions {
    /// Still offset from the cut point, in seconds.
    pub offset: f64,
    /// Hover clip length, in seconds.
    pub hover_duration: f64,
    /// Cut points processed at the same time.
    pub workers: usize,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for PreviewOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            offset: settings.preview_offset,
            hover_duration: settings.hover_duration,
            workers: settings.preview_workers,
        }
    }
}

/// How one artifact is extracted from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extraction {
    Still { at: f64 },
    Clip { start: f64, duration: f64 },
}

/// One planned artifact of a cut point.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPlan {
    pub kind: ArtifactKind,
    pub output: PathBuf,
    pub extraction: Extraction,
}

/// Plans the four artifacts of `point` in generation order.
///
/// Stills sit `offset` seconds either side of the cut (the "before" one never
/// earlier than 0, the "after" one pulled inside the media when its duration
/// is known). The "before" clip ends at the cut, the "after" clip starts at it.
pub fn plan_artifacts(
    point: &CutPoint,
    artifact_dir: &Path,
    options: &PreviewOptions,
    media_duration: Option<f64>,
) -> [ArtifactPlan; 4] {
    let mut still_after = point.time + options.offset;
    if let Some(duration) = media_duration {
        still_after = still_after.min((duration - AFTER_STILL_END_MARGIN).max(0.0));
    }

    ArtifactKind::ALL.map(|kind| {
        let extraction = match kind {
            ArtifactKind::StillBefore => Extraction::Still {
                at: (point.time - options.offset).max(0.0),
            },
            ArtifactKind::StillAfter => Extraction::Still { at: still_after },
            ArtifactKind::ClipBefore => Extraction::Clip {
                start: (point.time - options.hover_duration).max(0.0),
                duration: options.hover_duration,
            },
            ArtifactKind::ClipAfter => Extraction::Clip {
                start: point.time,
                duration: options.hover_duration,
            },
        };
        ArtifactPlan {
            kind,
            output: artifact_dir.join(kind.file_name(&point.id)),
            extraction,
        }
    })
}

/// Artifact generation that failed for one cut point.
#[derive(Debug)]
pub struct PreviewFailure {
    pub cut_point_id: String,
    pub error: EngineError,
}

/// Materializes preview artifacts for cut points of one source video.
pub struct PreviewGenerator<'a, M> {
    media: &'a M,
    source: &'a Path,
    artifact_dir: &'a Path,
    options: PreviewOptions,
    media_duration: Option<f64>,
}

impl<'a, M> PreviewGenerator<'a, M>
where
    M: MediaBackend + Sync,
{
    /// Creates a generator, probing the source duration once.
    ///
    /// A failed probe only disables end-of-media clamping.
    pub fn new(media: &'a M, source: &'a Path, artifact_dir: &'a Path, options: PreviewOptions) -> Self {
        let media_duration = match media.probe_duration(source) {
            Ok(duration) => duration,
            Err(error) => {
                warn!(path = ?source, %error, "duration probe failed, after-stills are not clamped");
                None
            }
        };

        Self {
            media,
            source,
            artifact_dir,
            options,
            media_duration,
        }
    }

    /// Generates artifacts for every point whose set is incomplete.
    ///
    /// A failing point keeps its artifacts stale and does not stop the
    /// others. Returns one entry per failed point.
    pub fn generate(&self, points: &mut [CutPoint]) -> Vec<PreviewFailure> {
        let mut pending: Vec<&mut CutPoint> = points
            .iter_mut()
            .filter(|point| !point.artifacts.is_complete())
            .collect();
        let total = pending.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.options.workers.clamp(1, total);
        let failures = if workers == 1 {
            self.generate_batch(&mut pending)
        } else {
            let chunk_size = total.div_ceil(workers);
            std::thread::scope(|scope| {
                let handles: Vec<_> = pending
                    .chunks_mut(chunk_size)
                    .map(|chunk| scope.spawn(move || self.generate_batch(chunk)))
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                    })
                    .collect()
            })
        };

        info!(
            source = ?self.source,
            generated = total - failures.len(),
            failed = failures.len(),
            workers,
            "preview artifacts generated"
        );
        failures
    }

    /// Regenerates all four artifacts of one point.
    ///
    /// Artifacts are marked stale first and only become ready once all four
    /// extractions succeeded.
    pub fn regenerate(&self, point: &mut CutPoint) -> Result<()> {
        point.artifacts.invalidate();

        let plans = plan_artifacts(point, self.artifact_dir, &self.options, self.media_duration);
        for plan in &plans {
            self.extract(&point.id, plan)?;
        }
        for plan in plans {
            point
                .artifacts
                .set(plan.kind, ArtifactState::Ready(plan.output));
        }

        debug!(cut_point_id = %point.id, time = point.time, "preview artifacts ready");
        Ok(())
    }

    fn generate_batch(&self, points: &mut [&mut CutPoint]) -> Vec<PreviewFailure> {
        let mut failures = Vec::new();
        for point in points.iter_mut() {
            if let Err(error) = self.regenerate(point) {
                warn!(cut_point_id = %point.id, %error, "preview generation failed");
                failures.push(PreviewFailure {
                    cut_point_id: point.id.clone(),
                    error,
                });
            }
        }
        failures
    }

    fn extract(&self, cut_point_id: &str, plan: &ArtifactPlan) -> Result<()> {
        let result = match plan.extraction {
            Extraction::Still { at } => self.media.extract_still(self.source, at, &plan.output),
            Extraction::Clip { start, duration } => {
                self.media
                    .extract_clip(self.source, start, duration, &plan.output)
            }
        };

        result.map_err(|source| EngineError::ArtifactExtractionFailure {
            cut_point_id: cut_point_id.to_string(),
            artifact: plan.kind,
            source,
        })
    }
}
