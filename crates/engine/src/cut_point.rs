use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{EngineError, Result};

/// The four preview artifacts kept per cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    StillBefore,
    StillAfter,
    ClipBefore,
    ClipAfter,
}

impl ArtifactKind {
    /// Generation order for one cut point.
    pub const ALL: [Self; 4] = [
        Self::StillBefore,
        Self::StillAfter,
        Self::ClipBefore,
        Self::ClipAfter,
    ];

    /// Deterministic file name for `cut_point_id`.
    ///
    /// # Example
    /// ```
    /// use engine::ArtifactKind;
    ///
    /// assert_eq!(ArtifactKind::ClipAfter.file_name("cp_1"), "cp_1_anim_after.gif");
    /// ```
    pub fn file_name(self, cut_point_id: &str) -> String {
        match self {
            Self::StillBefore => format!("{cut_point_id}_before.jpg"),
            Self::StillAfter => format!("{cut_point_id}_after.jpg"),
            Self::ClipBefore => format!("{cut_point_id}_anim_before.gif"),
            Self::ClipAfter => format!("{cut_point_id}_anim_after.gif"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StillBefore => "still before",
            Self::StillAfter => "still after",
            Self::ClipBefore => "clip before",
            Self::ClipAfter => "clip after",
        }
    }
}

/// Validity of one generated artifact.
///
/// Only `Ready` paths may be shown; `Stale` marks an artifact generated for a
/// previous `time` that still awaits regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArtifactState {
    #[default]
    Absent,
    Stale,
    Ready(PathBuf),
}

impl ArtifactState {
    pub fn ready_path(&self) -> Option<&Path> {
        match self {
            Self::Ready(path) => Some(path),
            _ => None,
        }
    }
}

/// Artifact slots of one cut point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewArtifacts {
    pub still_before: ArtifactState,
    pub still_after: ArtifactState,
    pub clip_before: ArtifactState,
    pub clip_after: ArtifactState,
}

impl PreviewArtifacts {
    pub fn get(&self, kind: ArtifactKind) -> &ArtifactState {
        match kind {
            ArtifactKind::StillBefore => &self.still_before,
            ArtifactKind::StillAfter => &self.still_after,
            ArtifactKind::ClipBefore => &self.clip_before,
            ArtifactKind::ClipAfter => &self.clip_after,
        }
    }

    pub fn set(&mut self, kind: ArtifactKind, state: ArtifactState) {
        let slot = match kind {
            ArtifactKind::StillBefore => &mut self.still_before,
            ArtifactKind::StillAfter => &mut self.still_after,
            ArtifactKind::ClipBefore => &mut self.clip_before,
            ArtifactKind::ClipAfter => &mut self.clip_after,
        };
        *slot = state;
    }

    /// Demotes every slot to `Stale`.
    pub fn invalidate(&mut self) {
        for kind in ArtifactKind::ALL {
            self.set(kind, ArtifactState::Stale);
        }
    }

    pub fn is_complete(&self) -> bool {
        ArtifactKind::ALL
            .iter()
            .all(|kind| self.get(*kind).ready_path().is_some())
    }

    pub fn ready_path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.get(kind).ready_path()
    }
}

/// A candidate split time inside a task.
#[derive(Debug, Clone, PartialEq)]
pub struct CutPoint {
    pub id: String,
    /// Split offset in seconds.
    pub time: f64,
    /// Time first assigned at detection or manual creation.
    pub original_time: f64,
    /// Length of the black interval this point was derived from.
    pub duration: Option<f64>,
    pub artifacts: PreviewArtifacts,
}

impl CutPoint {
    /// Creates a point with a fresh identity and `original_time == time`.
    pub fn new(time: f64, duration: Option<f64>) -> Self {
        Self {
            id: new_cut_point_id(),
            time,
            original_time: time,
            duration,
            artifacts: PreviewArtifacts::default(),
        }
    }

    /// Inclusive time window reachable by fine adjustment.
    pub fn fine_adjust_bounds(&self, range: f64) -> (f64, f64) {
        (
            (self.original_time - range).max(0.0),
            self.original_time + range,
        )
    }

    /// Moves the point and invalidates its artifacts when `time` changes.
    fn retime(&mut self, time: f64) -> bool {
        if self.time == time {
            return false;
        }
        self.time = time;
        self.artifacts.invalidate();
        true
    }
}

fn new_cut_point_id() -> String {
    format!("cp_{}", Uuid::new_v4().simple())
}

/// Cut points of one task, kept sorted ascending by `time`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutPointList {
    points: Vec<CutPoint>,
}

impl CutPointList {
    pub fn new(points: Vec<CutPoint>) -> Self {
        let mut list = Self { points };
        list.sort();
        list
    }

    pub fn as_slice(&self) -> &[CutPoint] {
        &self.points
    }

    pub fn as_mut_slice(&mut self) -> &mut [CutPoint] {
        &mut self.points
    }

    pub fn into_vec(self) -> Vec<CutPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.time).collect()
    }

    pub fn get(&self, id: &str) -> Option<&CutPoint> {
        self.points.iter().find(|point| point.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CutPoint> {
        self.points.iter_mut().find(|point| point.id == id)
    }

    /// Adds an operator-chosen point. No spacing rule applies.
    pub fn insert(&mut self, time: f64) -> Result<&CutPoint> {
        let time = validate_time(time)?;
        let point = CutPoint::new(time, None);
        let id = point.id.clone();
        self.points.push(point);
        self.sort();
        self.get(&id).ok_or(EngineError::CutPointNotFound { cut_point_id: id })
    }

    /// Sets `time`, invalidating artifacts if it changed. Returns whether
    /// the point moved.
    pub fn set_time(&mut self, id: &str, time: f64) -> Result<bool> {
        let time = validate_time(time)?;
        let moved = self.require_mut(id)?.retime(time);
        self.sort();
        Ok(moved)
    }

    /// Moves the point back to its original time.
    pub fn reset(&mut self, id: &str) -> Result<bool> {
        let original = self.require_mut(id)?.original_time;
        self.set_time(id, original)
    }

    /// Shifts the point by `delta`, clamped to the fine-adjustment window.
    pub fn nudge(&mut self, id: &str, delta: f64, range: f64) -> Result<bool> {
        if !delta.is_finite() {
            return Err(EngineError::InvalidTime { time: delta });
        }
        let point = self.require_mut(id)?;
        let (low, high) = point.fine_adjust_bounds(range);
        let target = (point.time + delta).clamp(low, high);
        self.set_time(id, target)
    }

    pub fn remove(&mut self, id: &str) -> Result<CutPoint> {
        let index = self
            .points
            .iter()
            .position(|point| point.id == id)
            .ok_or_else(|| EngineError::CutPointNotFound {
                cut_point_id: id.to_string(),
            })?;
        Ok(self.points.remove(index))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut CutPoint> {
        self.get_mut(id).ok_or_else(|| EngineError::CutPointNotFound {
            cut_point_id: id.to_string(),
        })
    }

    fn sort(&mut self) {
        sort_by_time(&mut self.points);
    }
}

/// Stable ascending sort by `time`.
pub(crate) fn sort_by_time(points: &mut [CutPoint]) {
    points.sort_by(|left, right| left.time.total_cmp(&right.time));
}

fn validate_time(time: f64) -> Result<f64> {
    if !time.is_finite() || time < 0.0 {
        return Err(EngineError::InvalidTime { time });
    }
    Ok(time)
}
