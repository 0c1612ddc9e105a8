//! Durable task records.
//!
//! Each task owns `<root>/<source stem>_<task id>/` holding `task.json` and
//! the preview artifacts. Every mutation is a read-modify-write of the whole
//! record under the store lock, written atomically. The store lock is an
//! advisory file lock on the tasks root, so separate processes sharing a root
//! serialize too.
//!
//! While a busy phase runs, the process running it holds an exclusive lock on
//! `task.lock` in the task directory. The OS drops that lock when the process
//! dies, which is how recovery tells an interrupted phase from a live one.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::{state_io, write_atomically};
use crate::cut_point::{ArtifactKind, ArtifactState, CutPoint, CutPointList, PreviewArtifacts};
use crate::error::{EngineError, Result};
use crate::task::{Task, TaskStatus};

/// Record file name inside a task directory.
pub const TASK_RECORD_FILE: &str = "task.json";

const STORE_LOCK_FILE: &str = ".store.lock";
const OWNER_LOCK_FILE: &str = "task.lock";

const TASK_ID_LEN: usize = 16;

/// A task together with its cut points, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskState {
    pub task: Task,
    pub cut_points: CutPointList,
}

/// Derives the stable task identity of an absolute source path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use engine::store::task_id_for;
///
/// let id = task_id_for(Path::new("/videos/movie.mp4"));
/// assert_eq!(id.len(), 16);
/// assert_eq!(id, task_id_for(Path::new("/videos/movie.mp4")));
/// ```
pub fn task_id_for(source: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    let mut id = format!("{:x}", hasher.finalize());
    id.truncate(TASK_ID_LEN);
    id
}

/// File-backed task store rooted at one directory.
#[derive(Debug)]
pub struct TaskStore {
    root: PathBuf,
    lock: Mutex<()>,
    /// Owner locks of the busy phases run through this store.
    owners: Mutex<HashMap<String, File>>,
}

impl TaskStore {
    /// Opens (and creates if needed) the tasks root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(state_io("create tasks root", &root))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
            owners: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the task for `source`, creating it on first reference.
    pub fn create_task(&self, source: &Path) -> Result<Task> {
        let source = std::path::absolute(source).map_err(state_io("resolve source path", source))?;
        if !source.is_file() {
            return Err(EngineError::InvalidSourcePath(source));
        }

        let id = task_id_for(&source);
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = self.root.join(format!("{stem}_{id}"));

        let _guard = self.guard()?;
        if folder.join(TASK_RECORD_FILE).is_file() {
            match read_record(&folder) {
                Ok(state) => {
                    debug!(task_id = %id, "task already exists");
                    return Ok(state.task);
                }
                Err(error) => {
                    warn!(task_id = %id, %error, "existing task record unreadable, recreating");
                }
            }
        }

        fs::create_dir_all(&folder).map_err(state_io("create task directory", &folder))?;
        let task = Task {
            id: id.clone(),
            name: source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            original_video_path: source,
            task_folder_path: folder,
            created_at: chrono::Utc::now().timestamp_millis(),
            status: TaskStatus::Idle,
            split_completed: false,
        };
        write_record(&task, &[])?;

        info!(task_id = %id, path = ?task.original_video_path, "task created");
        Ok(task)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task> {
        let _guard = self.guard()?;
        Ok(self.read_state(task_id)?.task)
    }

    /// All readable tasks, newest first. Malformed records are skipped.
    pub fn get_tasks(&self) -> Result<Vec<Task>> {
        let _guard = self.guard()?;
        let mut tasks: Vec<Task> = self
            .task_dirs()?
            .into_iter()
            .filter_map(|folder| match read_record(&folder) {
                Ok(state) => Some(state.task),
                Err(error) => {
                    warn!(folder = ?folder, %error, "skipping unreadable task record");
                    None
                }
            })
            .collect();
        tasks.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(tasks)
    }

    pub fn load(&self, task_id: &str) -> Result<TaskState> {
        let _guard = self.guard()?;
        self.read_state(task_id)
    }

    pub fn cut_points(&self, task: &Task) -> Result<CutPointList> {
        Ok(self.load(&task.id)?.cut_points)
    }

    /// Rewrites the descriptive task fields, keeping the stored cut points.
    ///
    /// Status and the split flag only move through `begin`/`finish`; the
    /// stored values win over whatever `task` carries.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        let _guard = self.guard()?;
        let stored = self.read_state(&task.id)?;
        let task = Task {
            task_folder_path: stored.task.task_folder_path,
            status: stored.task.status,
            split_completed: stored.task.split_completed,
            ..task.clone()
        };
        write_record(&task, stored.cut_points.as_slice())
    }

    /// Replaces the stored cut points of `task`, keeping the stored task
    /// fields.
    pub fn save_cut_points(&self, task: &Task, points: &[CutPoint]) -> Result<()> {
        let _guard = self.guard()?;
        let stored = self.read_state(&task.id)?;
        let mut points = points.to_vec();
        crate::cut_point::sort_by_time(&mut points);
        write_record(&stored.task, &points)?;

        debug!(task_id = %task.id, count = points.len(), "cut points saved");
        Ok(())
    }

    /// Applies `edit` to the cut points of a task that is not busy and
    /// persists the result.
    pub fn edit_cut_points<R>(
        &self,
        task_id: &str,
        edit: impl FnOnce(&mut CutPointList) -> Result<R>,
    ) -> Result<(TaskState, R)> {
        let _guard = self.guard()?;
        let mut state = self.read_state(task_id)?;
        ensure_not_busy(&state.task)?;

        let output = edit(&mut state.cut_points)?;
        write_record(&state.task, state.cut_points.as_slice())?;
        Ok((state, output))
    }

    /// Deletes the task directory with every artifact in it.
    pub fn remove_task(&self, task_id: &str) -> Result<()> {
        let _guard = self.guard()?;
        let state = self.read_state(task_id)?;
        ensure_not_busy(&state.task)?;

        let folder = &state.task.task_folder_path;
        fs::remove_dir_all(folder).map_err(state_io("remove task directory", folder))?;
        info!(task_id, "task removed");
        Ok(())
    }

    /// Moves a task into a busy phase, takes its owner lock and persists it.
    pub fn begin(&self, task_id: &str, status: TaskStatus) -> Result<TaskState> {
        let _guard = self.guard()?;
        let mut state = self.read_state(task_id)?;
        let from = state.task.status;
        state.task.begin(status)?;

        let claimed = self.claim_owner(&state.task, from)?;
        if let Err(error) = write_record(&state.task, state.cut_points.as_slice()) {
            if claimed {
                self.release_owner(task_id);
            }
            return Err(error);
        }

        debug!(task_id, %from, to = %status, "task phase started");
        Ok(state)
    }

    /// Ends the current busy phase, persists the resting status and drops
    /// the owner lock.
    pub fn finish(&self, task_id: &str, succeeded: bool) -> Result<Task> {
        let _guard = self.guard()?;
        let finished = self.read_state(task_id).and_then(|mut state| {
            let from = state.task.status;
            state.task.finish(succeeded)?;
            write_record(&state.task, state.cut_points.as_slice())?;
            debug!(task_id, %from, to = %state.task.status, succeeded, "task phase finished");
            Ok(state.task)
        });
        self.release_owner(task_id);
        finished
    }

    /// Returns tasks whose busy phase outlived its process to rest. Phases
    /// still owned by a live process are left alone.
    pub fn recover_interrupted(&self) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        let owned = self.owners();
        let mut recovered = Vec::new();
        for folder in self.task_dirs()? {
            let Ok(mut state) = read_record(&folder) else {
                continue;
            };
            if !state.task.status.is_busy() || owned.contains_key(&state.task.id) {
                continue;
            }

            let owner = open_lock_file(&folder.join(OWNER_LOCK_FILE))?;
            if FileExt::try_lock_exclusive(&owner).is_err() {
                debug!(task_id = %state.task.id, status = %state.task.status, "task phase owned by a live process");
                continue;
            }

            let interrupted = state.task.status;
            state.task.status = state.task.resting_status();
            write_record(&state.task, state.cut_points.as_slice())?;
            warn!(task_id = %state.task.id, %interrupted, "recovered interrupted task");
            recovered.push(state.task.id);
        }
        Ok(recovered)
    }

    fn guard(&self) -> Result<StoreGuard<'_>> {
        let local = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.root.join(STORE_LOCK_FILE);
        let file = open_lock_file(&path)?;
        FileExt::lock_exclusive(&file).map_err(state_io("lock tasks root", &path))?;
        Ok(StoreGuard {
            file,
            _local: local,
        })
    }

    fn owners(&self) -> MutexGuard<'_, HashMap<String, File>> {
        self.owners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the owner lock of `task` unless this store already holds it
    /// (the detection to preview handover). Returns whether it was taken now.
    fn claim_owner(&self, task: &Task, from: TaskStatus) -> Result<bool> {
        let mut owners = self.owners();
        if owners.contains_key(&task.id) {
            return Ok(false);
        }

        let file = open_lock_file(&task.task_folder_path.join(OWNER_LOCK_FILE))?;
        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(EngineError::TaskBusy {
                task_id: task.id.clone(),
                status: from,
            });
        }
        owners.insert(task.id.clone(), file);
        Ok(true)
    }

    fn release_owner(&self, task_id: &str) {
        let Some(file) = self.owners().remove(task_id) else {
            return;
        };
        if let Err(error) = FileExt::unlock(&file) {
            warn!(task_id, %error, "failed to release task owner lock");
        }
    }

    fn read_state(&self, task_id: &str) -> Result<TaskState> {
        let folder = self.find_task_dir(task_id)?;
        read_record(&folder).map_err(|error| match error {
            EngineError::StateCorruption { .. } => {
                warn!(task_id, %error, "task record is malformed, treating as absent");
                EngineError::TaskNotFound {
                    task_id: task_id.to_string(),
                }
            }
            other => other,
        })
    }

    fn find_task_dir(&self, task_id: &str) -> Result<PathBuf> {
        let suffix = format!("_{task_id}");
        self.task_dirs()?
            .into_iter()
            .find(|folder| {
                folder
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().ends_with(&suffix))
            })
            .ok_or_else(|| EngineError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    fn task_dirs(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(state_io("read tasks root", &self.root))?;
        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(state_io("read tasks root", &self.root))?;
            let path = entry.path();
            if path.join(TASK_RECORD_FILE).is_file() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }
}

/// Store mutex plus the cross-process root lock; both released on drop.
struct StoreGuard<'a> {
    file: File,
    _local: MutexGuard<'a, ()>,
}

impl Drop for StoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            warn!(%error, "failed to release tasks root lock");
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(state_io("open lock file", path))
}

fn ensure_not_busy(task: &Task) -> Result<()> {
    if task.status.is_busy() {
        return Err(EngineError::TaskBusy {
            task_id: task.id.clone(),
            status: task.status,
        });
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    task: TaskFields,
    #[serde(default)]
    cut_points: Vec<CutPointRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskFields {
    id: String,
    name: String,
    original_video_path: PathBuf,
    task_folder_path: PathBuf,
    created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(default)]
    is_split: bool,
    #[serde(default)]
    is_loading: bool,
    #[serde(default)]
    is_splitting: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CutPointRecord {
    id: String,
    time: f64,
    #[serde(default)]
    original_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_before: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_after: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_anim_before: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_anim_after: Option<PathBuf>,
}

impl CutPointRecord {
    fn from_cut_point(point: &CutPoint) -> Self {
        let ready = |kind| point.artifacts.ready_path(kind).map(Path::to_path_buf);
        Self {
            id: point.id.clone(),
            time: point.time,
            original_time: Some(point.original_time),
            duration: point.duration,
            preview_before: ready(ArtifactKind::StillBefore),
            preview_after: ready(ArtifactKind::StillAfter),
            preview_anim_before: ready(ArtifactKind::ClipBefore),
            preview_anim_after: ready(ArtifactKind::ClipAfter),
        }
    }

    /// Artifact files that have disappeared since the record was written
    /// load as absent.
    fn into_cut_point(self) -> CutPoint {
        let mut artifacts = PreviewArtifacts::default();
        let paths = [
            (ArtifactKind::StillBefore, self.preview_before),
            (ArtifactKind::StillAfter, self.preview_after),
            (ArtifactKind::ClipBefore, self.preview_anim_before),
            (ArtifactKind::ClipAfter, self.preview_anim_after),
        ];
        for (kind, path) in paths {
            if let Some(path) = path.filter(|path| path.is_file()) {
                artifacts.set(kind, ArtifactState::Ready(path));
            }
        }

        CutPoint {
            id: self.id,
            time: self.time,
            original_time: self.original_time.unwrap_or(self.time),
            duration: self.duration,
            artifacts,
        }
    }
}

fn read_record(folder: &Path) -> Result<TaskState> {
    let path = folder.join(TASK_RECORD_FILE);
    let content = fs::read_to_string(&path).map_err(state_io("read task record", &path))?;
    let record: TaskRecord = serde_json::from_str(&content)
        .map_err(|source| EngineError::StateCorruption { path, source })?;

    let cut_points = CutPointList::new(
        record
            .cut_points
            .into_iter()
            .map(CutPointRecord::into_cut_point)
            .collect(),
    );
    let fields = record.task;
    let mut task = Task {
        id: fields.id,
        name: fields.name,
        original_video_path: fields.original_video_path,
        task_folder_path: fields.task_folder_path,
        created_at: fields.created_at,
        status: TaskStatus::Idle,
        split_completed: fields.is_split,
    };
    // The flags decide busy or resting; `status` only names the loading
    // phase. Records without it fall back to the cut-point count.
    task.status = if fields.is_splitting {
        TaskStatus::Splitting
    } else if fields.is_loading {
        match fields.status {
            Some(status @ (TaskStatus::Detecting | TaskStatus::Previewing)) => status,
            _ if cut_points.is_empty() => TaskStatus::Detecting,
            _ => TaskStatus::Previewing,
        }
    } else {
        task.resting_status()
    };

    Ok(TaskState { task, cut_points })
}

fn write_record(task: &Task, points: &[CutPoint]) -> Result<()> {
    let path = task.task_folder_path.join(TASK_RECORD_FILE);
    let record = TaskRecord {
        task: TaskFields {
            id: task.id.clone(),
            name: task.name.clone(),
            original_video_path: task.original_video_path.clone(),
            task_folder_path: task.task_folder_path.clone(),
            created_at: task.created_at,
            status: Some(task.status),
            is_split: task.is_split(),
            is_loading: task.is_loading(),
            is_splitting: task.is_splitting(),
        },
        cut_points: points.iter().map(CutPointRecord::from_cut_point).collect(),
    };

    let content = serde_json::to_string_pretty(&record).map_err(|source| {
        EngineError::StateSerialization {
            path: path.clone(),
            source,
        }
    })?;
    write_atomically(&path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{TASK_RECORD_FILE, TaskStore, task_id_for};
    use crate::cut_point::{ArtifactKind, ArtifactState, CutPoint};
    use crate::error::EngineError;
    use crate::task::TaskStatus;

    fn fixture() -> (TempDir, TaskStore, PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let video = dir.path().join("movie.mp4");
        std::fs::write(&video, b"not really a video").expect("write video");
        let store = TaskStore::open(dir.path().join("tasks")).expect("open store");
        (dir, store, video)
    }

    #[test]
    fn create_task_is_idempotent_per_path() {
        let (_dir, store, video) = fixture();

        let first = store.create_task(&video).expect("create");
        let second = store.create_task(&video).expect("create again");

        assert_eq!(first, second);
        assert_eq!(first.id, task_id_for(&video));
        assert_eq!(first.name, "movie.mp4");
        assert_eq!(
            first.task_folder_path,
            store.root().join(format!("movie_{}", first.id))
        );
        assert_eq!(store.get_tasks().expect("tasks").len(), 1);
    }

    #[test]
    fn create_task_rejects_missing_source() {
        let (dir, store, _video) = fixture();

        let error = store
            .create_task(&dir.path().join("missing.mp4"))
            .expect_err("must fail");

        assert!(matches!(error, EngineError::InvalidSourcePath(_)));
    }

    #[test]
    fn cut_points_round_trip_sorted_with_fields() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");
        let mut moved = CutPoint::new(40.0, Some(0.3));
        moved.time = 41.5;
        let manual = CutPoint::new(12.0, None);

        store
            .save_cut_points(&task, &[moved.clone(), manual.clone()])
            .expect("save");
        let loaded = store.cut_points(&task).expect("load");

        assert_eq!(loaded.times(), vec![12.0, 41.5]);
        let loaded_moved = loaded.get(&moved.id).expect("moved point");
        assert_eq!(loaded_moved.original_time, 40.0);
        assert_eq!(loaded_moved.duration, Some(0.3));
        assert_eq!(loaded.get(&manual.id).expect("manual").duration, None);
    }

    #[test]
    fn only_existing_ready_artifacts_are_persisted() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");
        let mut point = CutPoint::new(10.0, None);
        let still = task.task_folder_path.join(ArtifactKind::StillBefore.file_name(&point.id));
        std::fs::write(&still, b"jpg").expect("write still");
        point
            .artifacts
            .set(ArtifactKind::StillBefore, ArtifactState::Ready(still.clone()));
        point.artifacts.set(ArtifactKind::StillAfter, ArtifactState::Stale);
        point.artifacts.set(
            ArtifactKind::ClipBefore,
            ArtifactState::Ready(task.task_folder_path.join("gone.gif")),
        );

        store.save_cut_points(&task, &[point.clone()]).expect("save");
        let raw = std::fs::read_to_string(task.task_folder_path.join(TASK_RECORD_FILE))
            .expect("read record");
        let loaded = store.cut_points(&task).expect("load");

        assert!(raw.contains("previewBefore"));
        assert!(!raw.contains("previewAfter"));
        let loaded = loaded.get(&point.id).expect("point");
        assert_eq!(loaded.artifacts.ready_path(ArtifactKind::StillBefore), Some(still.as_path()));
        assert_eq!(loaded.artifacts.get(ArtifactKind::StillAfter), &ArtifactState::Absent);
        assert_eq!(loaded.artifacts.get(ArtifactKind::ClipBefore), &ArtifactState::Absent);
    }

    #[test]
    fn update_task_preserves_cut_points() {
        let (_dir, store, video) = fixture();
        let mut task = store.create_task(&video).expect("create");
        store
            .save_cut_points(&task, &[CutPoint::new(5.0, None)])
            .expect("save");

        task.name = "renamed.mp4".to_string();
        store.update_task(&task).expect("update");

        assert_eq!(store.get_task(&task.id).expect("get").name, "renamed.mp4");
        assert_eq!(store.cut_points(&task).expect("points").len(), 1);
    }

    #[test]
    fn busy_phase_is_exclusive_and_persisted() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");

        store.begin(&task.id, TaskStatus::Splitting).expect("begin");
        let error = store
            .begin(&task.id, TaskStatus::Detecting)
            .expect_err("must reject");

        assert!(matches!(error, EngineError::TaskBusy { .. }));
        assert!(store.get_task(&task.id).expect("get").is_splitting());
        assert!(matches!(
            store.remove_task(&task.id),
            Err(EngineError::TaskBusy { .. })
        ));

        let finished = store.finish(&task.id, true).expect("finish");
        assert!(finished.is_split());
        assert_eq!(store.get_task(&task.id).expect("get").status, TaskStatus::Split);
    }

    #[test]
    fn update_task_cannot_rewrite_status_or_clear_split_flag() {
        let (_dir, store, video) = fixture();
        let mut stale = store.create_task(&video).expect("create");
        store.begin(&stale.id, TaskStatus::Splitting).expect("begin");
        store.finish(&stale.id, true).expect("finish");

        stale.name = "renamed.mp4".to_string();
        store.update_task(&stale).expect("update stale copy");
        let task = store.get_task(&stale.id).expect("get");
        assert_eq!(task.name, "renamed.mp4");
        assert!(task.is_split());
        assert_eq!(task.status, TaskStatus::Split);

        stale.status = TaskStatus::Splitting;
        store.update_task(&stale).expect("update forced status");
        assert_eq!(store.get_task(&stale.id).expect("get").status, TaskStatus::Split);
    }

    #[test]
    fn detecting_survives_saving_cut_points_and_hands_over() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");
        store.begin(&task.id, TaskStatus::Detecting).expect("begin");

        store
            .save_cut_points(&task, &[CutPoint::new(10.1, Some(0.2))])
            .expect("save");
        assert_eq!(
            store.get_task(&task.id).expect("get").status,
            TaskStatus::Detecting
        );

        store
            .begin(&task.id, TaskStatus::Previewing)
            .expect("handover to previewing");
        assert_eq!(
            store.finish(&task.id, true).expect("finish").status,
            TaskStatus::Idle
        );
    }

    #[test]
    fn recovery_returns_tasks_of_a_dead_owner_to_rest() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");
        store.begin(&task.id, TaskStatus::Detecting).expect("begin");
        let root = store.root().to_path_buf();
        drop(store);

        let reopened = TaskStore::open(&root).expect("reopen");
        assert_eq!(
            reopened.get_task(&task.id).expect("get").status,
            TaskStatus::Detecting
        );
        let recovered = reopened.recover_interrupted().expect("recover");

        assert_eq!(recovered, vec![task.id.clone()]);
        assert_eq!(reopened.get_task(&task.id).expect("get").status, TaskStatus::Idle);
    }

    #[test]
    fn recovery_keeps_phases_owned_by_a_live_store() {
        let (_dir, owner, video) = fixture();
        let task = owner.create_task(&video).expect("create");
        owner.begin(&task.id, TaskStatus::Splitting).expect("begin");

        let other = TaskStore::open(owner.root()).expect("open second store");
        assert!(other.recover_interrupted().expect("recover").is_empty());
        assert!(owner.recover_interrupted().expect("recover").is_empty());
        assert!(matches!(
            other.begin(&task.id, TaskStatus::Splitting),
            Err(EngineError::TaskBusy {
                status: TaskStatus::Splitting,
                ..
            })
        ));

        let finished = owner.finish(&task.id, true).expect("finish");
        assert!(finished.is_split());
        assert_eq!(other.get_task(&task.id).expect("get").status, TaskStatus::Split);
    }

    #[test]
    fn malformed_record_is_treated_as_absent() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");
        std::fs::write(task.task_folder_path.join(TASK_RECORD_FILE), "{ broken").expect("corrupt");

        assert!(store.get_tasks().expect("tasks").is_empty());
        assert!(matches!(
            store.get_task(&task.id),
            Err(EngineError::TaskNotFound { .. })
        ));

        let recreated = store.create_task(&video).expect("recreate");
        assert_eq!(recreated.id, task.id);
    }

    #[test]
    fn get_tasks_orders_newest_first() {
        let (dir, store, video) = fixture();
        let other = dir.path().join("other.mp4");
        std::fs::write(&other, b"x").expect("write video");
        let mut older = store.create_task(&video).expect("create");
        older.created_at = 1_000;
        store.update_task(&older).expect("update");
        let newer = store.create_task(&other).expect("create");

        let ids: Vec<String> = store
            .get_tasks()
            .expect("tasks")
            .into_iter()
            .map(|task| task.id)
            .collect();

        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn remove_task_deletes_directory() {
        let (_dir, store, video) = fixture();
        let task = store.create_task(&video).expect("create");

        store.remove_task(&task.id).expect("remove");

        assert!(!task.task_folder_path.exists());
        assert!(matches!(
            store.get_task(&task.id),
            Err(EngineError::TaskNotFound { .. })
        ));
    }
}
