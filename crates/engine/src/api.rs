use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backend::{FfmpegMediaBackend, MediaBackend};
use crate::config::{Settings, SettingsManager};
use crate::cut_point::{ArtifactKind, CutPoint, CutPointList};
use crate::detect::{parse_black_intervals, synthesize_cut_points};
use crate::error::{EngineError, Result};
use crate::preview::{PreviewGenerator, PreviewOptions};
use crate::segment::{list_split_outputs, plan_segments, split_output_dir};
use crate::store::{TaskState, TaskStore};
use crate::task::{Task, TaskStatus};

/// Commands accepted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Registers a source video. Repeating it for the same path returns the
    /// existing task.
    CreateTask {
        path: PathBuf,
    },
    ListTasks,
    ShowTask {
        task_id: String,
    },
    /// Detects cut points when the task has none yet, then generates any
    /// missing preview artifacts.
    ///
    /// # Example
    /// ```no_run
    /// use engine::{Command, Engine, FfmpegMediaBackend};
    ///
    /// let mut engine = Engine::open(FfmpegMediaBackend, "/tmp/cutpoint-tasks")?;
    /// let events = engine.handle_command(Command::CreateTask {
    ///     path: "movie.mp4".into(),
    /// })?;
    /// # let task_id = String::new();
    /// let _ = engine.handle_command(Command::Detect { task_id })?;
    /// # let _ = events;
    /// # Ok::<(), engine::EngineError>(())
    /// ```
    Detect {
        task_id: String,
    },
    /// Adds an operator-chosen cut point. The spacing rule does not apply.
    AddCutPoint {
        task_id: String,
        time: f64,
    },
    UpdateCutPoint {
        task_id: String,
        cut_point_id: String,
        time: f64,
    },
    /// Shifts a cut point by `delta` seconds within the fine-adjustment
    /// window around its original time.
    NudgeCutPoint {
        task_id: String,
        cut_point_id: String,
        delta: f64,
    },
    ResetCutPoint {
        task_id: String,
        cut_point_id: String,
    },
    DeleteCutPoint {
        task_id: String,
        cut_point_id: String,
    },
    /// Splits the source at the current cut points.
    ConfirmSplit {
        task_id: String,
    },
    DeleteTask {
        task_id: String,
    },
    ListSplitOutputs {
        task_id: String,
    },
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TaskChanged(TaskSnapshot),
    TasksListed(Vec<Task>),
    PreviewFailed {
        task_id: String,
        cut_point_id: String,
        message: String,
    },
    SplitFinished {
        task_id: String,
        output_dir: PathBuf,
        outputs: Vec<PathBuf>,
    },
    SplitOutputsListed {
        task_id: String,
        output_dir: PathBuf,
        outputs: Vec<PathBuf>,
    },
    TaskDeleted {
        task_id: String,
    },
}

/// Coarse error category for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    NotFound,
    Busy,
    InvalidInput,
    DetectionFailed,
    PreviewFailed,
    SplitFailed,
    Storage,
    Other,
}

impl EngineErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Busy => "busy",
            Self::InvalidInput => "invalid_input",
            Self::DetectionFailed => "detection_failed",
            Self::PreviewFailed => "preview_failed",
            Self::SplitFailed => "split_failed",
            Self::Storage => "storage",
            Self::Other => "other",
        }
    }
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::TaskNotFound { .. } | EngineError::CutPointNotFound { .. } => {
                Self::NotFound
            }
            EngineError::TaskBusy { .. } => Self::Busy,
            EngineError::InvalidTransition { .. }
            | EngineError::InvalidTime { .. }
            | EngineError::InvalidSourcePath(_) => Self::InvalidInput,
            EngineError::ProbeLaunchFailure { .. } | EngineError::ProbeFailure { .. } => {
                Self::DetectionFailed
            }
            EngineError::ArtifactExtractionFailure { .. } => Self::PreviewFailed,
            EngineError::SplitFailure { .. } => Self::SplitFailed,
            EngineError::StateCorruption { .. }
            | EngineError::StateIo { .. }
            | EngineError::StateSerialization { .. } => Self::Storage,
            EngineError::Media(_) => Self::Other,
        }
    }
}

/// User-facing error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// A task and its sorted cut points, as handed to front ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task: Task,
    pub cut_points: Vec<CutPoint>,
}

impl From<TaskState> for TaskSnapshot {
    fn from(state: TaskState) -> Self {
        Self {
            task: state.task,
            cut_points: state.cut_points.into_vec(),
        }
    }
}

/// Pipeline handle over one tasks root.
#[derive(Debug)]
pub struct Engine<M> {
    media: M,
    store: TaskStore,
    settings: Settings,
}

impl<M> Engine<M>
where
    M: MediaBackend + Sync,
{
    pub fn new(media: M, store: TaskStore, mut settings: Settings) -> Self {
        settings.normalize();
        Self {
            media,
            store,
            settings,
        }
    }

    /// Opens `tasks_root`, loads its settings and returns tasks left busy by
    /// a process that no longer runs to rest. Phases owned by a live process,
    /// including another engine on the same root, are kept.
    pub fn open(media: M, tasks_root: impl Into<PathBuf>) -> Result<Self> {
        let store = TaskStore::open(tasks_root)?;
        let settings = SettingsManager::new(store.root()).load();
        let recovered = store.recover_interrupted()?;
        if !recovered.is_empty() {
            info!(count = recovered.len(), "interrupted tasks recovered");
        }
        Ok(Self::new(media, store, settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::CreateTask { path } => self.create_task(&path),
            Command::ListTasks => Ok(vec![Event::TasksListed(self.store.get_tasks()?)]),
            Command::ShowTask { task_id } => {
                Ok(vec![Event::TaskChanged(self.store.load(&task_id)?.into())])
            }
            Command::Detect { task_id } => self.detect(&task_id),
            Command::AddCutPoint { task_id, time } => self.edit_cut_point(&task_id, |points| {
                Ok(Some(points.insert(time)?.id.clone()))
            }),
            Command::UpdateCutPoint {
                task_id,
                cut_point_id,
                time,
            } => self.edit_cut_point(&task_id, |points| {
                let moved = points.set_time(&cut_point_id, time)?;
                Ok(needs_preview(points, cut_point_id, moved))
            }),
            Command::NudgeCutPoint {
                task_id,
                cut_point_id,
                delta,
            } => {
                let range = self.settings.fine_adjust_range;
                self.edit_cut_point(&task_id, |points| {
                    let moved = points.nudge(&cut_point_id, delta, range)?;
                    Ok(needs_preview(points, cut_point_id, moved))
                })
            }
            Command::ResetCutPoint {
                task_id,
                cut_point_id,
            } => self.edit_cut_point(&task_id, |points| {
                let moved = points.reset(&cut_point_id)?;
                Ok(needs_preview(points, cut_point_id, moved))
            }),
            Command::DeleteCutPoint {
                task_id,
                cut_point_id,
            } => self.delete_cut_point(&task_id, &cut_point_id),
            Command::ConfirmSplit { task_id } => self.confirm_split(&task_id),
            Command::DeleteTask { task_id } => {
                self.store.remove_task(&task_id)?;
                Ok(vec![Event::TaskDeleted { task_id }])
            }
            Command::ListSplitOutputs { task_id } => self.list_split_outputs(task_id),
        }
    }

    fn create_task(&self, path: &Path) -> Result<Vec<Event>> {
        let task = self.store.create_task(path)?;
        let state = self.store.load(&task.id)?;
        Ok(vec![Event::TaskChanged(state.into())])
    }

    fn detect(&self, task_id: &str) -> Result<Vec<Event>> {
        let stored = self.store.load(task_id)?;
        if !stored.cut_points.is_empty() {
            let state = self.store.begin(task_id, TaskStatus::Previewing)?;
            return self.generate_previews(state);
        }
        if stored.task.is_split() {
            debug!(task_id, "split task has no cut points, skipping detection");
            return Ok(vec![Event::TaskChanged(stored.into())]);
        }

        let state = self.store.begin(task_id, TaskStatus::Detecting)?;
        let detected = self.detect_cut_points(&state.task).and_then(|points| {
            self.store.save_cut_points(&state.task, &points)?;
            Ok(points)
        });
        let points = match detected {
            Ok(points) => points,
            Err(error) => return Err(self.abort_phase(task_id, error)),
        };

        if points.is_empty() {
            let task = self.store.finish(task_id, true)?;
            return Ok(vec![Event::TaskChanged(TaskSnapshot {
                task,
                cut_points: Vec::new(),
            })]);
        }

        match self.store.begin(task_id, TaskStatus::Previewing) {
            Ok(state) => self.generate_previews(state),
            Err(error) => Err(self.abort_phase(task_id, error)),
        }
    }

    fn detect_cut_points(&self, task: &Task) -> Result<Vec<CutPoint>> {
        let source = &task.original_video_path;
        let diagnostics = self
            .media
            .detect_black_frames(source, &self.settings.black_detect_params())
            .map_err(|error| EngineError::from_probe(source.clone(), error))?;

        let intervals = parse_black_intervals(&diagnostics);
        let points = synthesize_cut_points(&intervals, self.settings.min_slice_duration);
        info!(
            task_id = %task.id,
            intervals = intervals.len(),
            cut_points = points.len(),
            "black frames detected"
        );
        Ok(points)
    }

    /// Fills missing artifacts of a task already in `Previewing` and saves
    /// the whole list once.
    fn generate_previews(&self, mut state: TaskState) -> Result<Vec<Event>> {
        let task_id = state.task.id.clone();
        let failures = self
            .preview_generator(&state.task)
            .generate(state.cut_points.as_mut_slice());
        let saved = self
            .store
            .save_cut_points(&state.task, state.cut_points.as_slice());
        let (task, ()) = self.finish_phase(&task_id, saved)?;

        let mut events = vec![Event::TaskChanged(TaskSnapshot {
            task,
            cut_points: state.cut_points.into_vec(),
        })];
        events.extend(failures.into_iter().map(|failure| Event::PreviewFailed {
            task_id: task_id.clone(),
            cut_point_id: failure.cut_point_id,
            message: failure.error.to_string(),
        }));
        Ok(events)
    }

    fn edit_cut_point<F>(&self, task_id: &str, edit: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut CutPointList) -> Result<Option<String>>,
    {
        let mut state = self.store.begin(task_id, TaskStatus::Previewing)?;
        let outcome = self.apply_edit(&mut state, edit);
        let (task, failures) = self.finish_phase(task_id, outcome)?;

        let mut events = vec![Event::TaskChanged(TaskSnapshot {
            task,
            cut_points: state.cut_points.into_vec(),
        })];
        events.extend(failures);
        Ok(events)
    }

    /// Applies `edit`, persists the invalidated artifacts, then regenerates
    /// the one affected point.
    fn apply_edit<F>(&self, state: &mut TaskState, edit: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut CutPointList) -> Result<Option<String>>,
    {
        let Some(cut_point_id) = edit(&mut state.cut_points)? else {
            return Ok(Vec::new());
        };
        self.store
            .save_cut_points(&state.task, state.cut_points.as_slice())?;

        let point = state.cut_points.get_mut(&cut_point_id).ok_or_else(|| {
            EngineError::CutPointNotFound {
                cut_point_id: cut_point_id.clone(),
            }
        })?;
        let mut events = Vec::new();
        if let Err(error) = self.preview_generator(&state.task).regenerate(point) {
            warn!(task_id = %state.task.id, cut_point_id = %cut_point_id, %error, "preview regeneration failed");
            events.push(Event::PreviewFailed {
                task_id: state.task.id.clone(),
                cut_point_id,
                message: error.to_string(),
            });
        }

        self.store
            .save_cut_points(&state.task, state.cut_points.as_slice())?;
        Ok(events)
    }

    fn delete_cut_point(&self, task_id: &str, cut_point_id: &str) -> Result<Vec<Event>> {
        let (state, removed) = self
            .store
            .edit_cut_points(task_id, |points| points.remove(cut_point_id))?;

        for kind in ArtifactKind::ALL {
            let path = state.task.task_folder_path.join(kind.file_name(&removed.id));
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => warn!(path = ?path, %error, "failed to remove preview artifact"),
            }
        }

        info!(task_id, cut_point_id, time = removed.time, "cut point deleted");
        Ok(vec![Event::TaskChanged(state.into())])
    }

    fn confirm_split(&self, task_id: &str) -> Result<Vec<Event>> {
        let state = self.store.begin(task_id, TaskStatus::Splitting)?;
        let output_dir = split_output_dir(self.store.root(), &state.task.original_video_path);
        let outcome = self.split(&state, &output_dir);
        let (task, outputs) = self.finish_phase(task_id, outcome)?;

        Ok(vec![
            Event::TaskChanged(TaskSnapshot {
                task,
                cut_points: state.cut_points.into_vec(),
            }),
            Event::SplitFinished {
                task_id: task_id.to_string(),
                output_dir,
                outputs,
            },
        ])
    }

    fn split(&self, state: &TaskState, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let source = &state.task.original_video_path;
        let duration = self.media.probe_duration(source).unwrap_or_else(|error| {
            warn!(path = ?source, %error, "duration probe failed, last segment end unknown");
            None
        });

        let plan = plan_segments(source, &state.cut_points.times(), output_dir, duration);
        info!(
            task_id = %state.task.id,
            boundaries = plan.boundaries.len(),
            output_dir = ?output_dir,
            "split started"
        );
        plan.execute(&self.media)
    }

    fn list_split_outputs(&self, task_id: String) -> Result<Vec<Event>> {
        let task = self.store.get_task(&task_id)?;
        let output_dir = split_output_dir(self.store.root(), &task.original_video_path);
        let outputs = list_split_outputs(&output_dir, &task.original_video_path)?;
        Ok(vec![Event::SplitOutputsListed {
            task_id,
            output_dir,
            outputs,
        }])
    }

    /// Ends the running phase according to `outcome`.
    fn finish_phase<T>(&self, task_id: &str, outcome: Result<T>) -> Result<(Task, T)> {
        match outcome {
            Ok(value) => Ok((self.store.finish(task_id, true)?, value)),
            Err(error) => Err(self.abort_phase(task_id, error)),
        }
    }

    /// Returns the task to rest after a failed phase and hands back `error`,
    /// even if the status write fails too.
    fn abort_phase(&self, task_id: &str, error: EngineError) -> EngineError {
        if let Err(finish_error) = self.store.finish(task_id, false) {
            warn!(task_id, %finish_error, "failed to return task to rest");
        }
        error
    }

    fn preview_generator<'a>(&'a self, task: &'a Task) -> PreviewGenerator<'a, M> {
        PreviewGenerator::new(
            &self.media,
            &task.original_video_path,
            &task.task_folder_path,
            PreviewOptions::from(&self.settings),
        )
    }
}

/// Id to regenerate after an edit: the point moved, or its artifacts were
/// never completed.
fn needs_preview(points: &CutPointList, cut_point_id: String, moved: bool) -> Option<String> {
    let complete = points
        .get(&cut_point_id)
        .is_some_and(|point| point.artifacts.is_complete());
    (moved || !complete).then_some(cut_point_id)
}

impl Engine<FfmpegMediaBackend> {
    /// Opens an engine wired to the FFmpeg backend.
    pub fn with_ffmpeg(tasks_root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(FfmpegMediaBackend, tasks_root)
    }
}
