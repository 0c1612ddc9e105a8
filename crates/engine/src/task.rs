use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Lifecycle phase of a task.
///
/// `Detecting`, `Previewing` and `Splitting` are busy phases; a task in a
/// busy phase rejects any request to enter another one, except that a
/// detection run hands over directly to preview generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Idle,
    Detecting,
    Previewing,
    Splitting,
    Split,
}

impl TaskStatus {
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Detecting | Self::Previewing | Self::Splitting)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Previewing => "previewing",
            Self::Splitting => "splitting",
            Self::Split => "split",
        };
        f.write_str(label)
    }
}

/// One source video and its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub original_video_path: PathBuf,
    pub task_folder_path: PathBuf,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub status: TaskStatus,
    /// Set once a split has completed; never cleared.
    pub split_completed: bool,
}

impl Task {
    /// Detection or preview generation is running.
    pub fn is_loading(&self) -> bool {
        matches!(self.status, TaskStatus::Detecting | TaskStatus::Previewing)
    }

    pub fn is_splitting(&self) -> bool {
        self.status == TaskStatus::Splitting
    }

    pub fn is_split(&self) -> bool {
        self.split_completed
    }

    /// Status the task returns to when no work is running.
    pub fn resting_status(&self) -> TaskStatus {
        if self.split_completed {
            TaskStatus::Split
        } else {
            TaskStatus::Idle
        }
    }

    /// Enters a busy phase.
    ///
    /// Fails with `TaskBusy` while another phase runs, and with
    /// `InvalidTransition` for detection on an already split task or when
    /// `to` is not a busy phase.
    pub(crate) fn begin(&mut self, to: TaskStatus) -> Result<()> {
        if !to.is_busy() {
            return Err(self.invalid_transition(to));
        }

        let handover = self.status == TaskStatus::Detecting && to == TaskStatus::Previewing;
        if self.status.is_busy() && !handover {
            return Err(EngineError::TaskBusy {
                task_id: self.id.clone(),
                status: self.status,
            });
        }
        if to == TaskStatus::Detecting && self.split_completed {
            return Err(self.invalid_transition(to));
        }

        self.status = to;
        Ok(())
    }

    /// Leaves the current busy phase.
    ///
    /// A successful split marks the task as split for good; every other
    /// outcome returns to the resting status.
    pub(crate) fn finish(&mut self, succeeded: bool) -> Result<()> {
        if !self.status.is_busy() {
            return Err(self.invalid_transition(self.resting_status()));
        }

        if self.status == TaskStatus::Splitting && succeeded {
            self.split_completed = true;
        }
        self.status = self.resting_status();
        Ok(())
    }

    fn invalid_transition(&self, to: TaskStatus) -> EngineError {
        EngineError::InvalidTransition {
            task_id: self.id.clone(),
            from: self.status,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Task, TaskStatus};
    use crate::error::EngineError;

    fn sample_task() -> Task {
        Task {
            id: "abc".to_string(),
            name: "movie.mp4".to_string(),
            original_video_path: PathBuf::from("/videos/movie.mp4"),
            task_folder_path: PathBuf::from("/tasks/movie_abc"),
            created_at: 1_700_000_000_000,
            status: TaskStatus::Idle,
            split_completed: false,
        }
    }

    #[test]
    fn detection_hands_over_to_previewing() {
        let mut task = sample_task();
        task.begin(TaskStatus::Detecting).expect("begin detection");
        task.begin(TaskStatus::Previewing).expect("handover");

        assert!(task.is_loading());
        task.finish(true).expect("finish");
        assert_eq!(task.status, TaskStatus::Idle);
    }

    #[test]
    fn busy_task_rejects_second_split() {
        let mut task = sample_task();
        task.begin(TaskStatus::Splitting).expect("begin split");

        let error = task.begin(TaskStatus::Splitting).expect_err("must reject");
        assert!(matches!(
            error,
            EngineError::TaskBusy {
                status: TaskStatus::Splitting,
                ..
            }
        ));
    }

    #[test]
    fn detecting_task_rejects_split() {
        let mut task = sample_task();
        task.begin(TaskStatus::Detecting).expect("begin detection");

        assert!(task.begin(TaskStatus::Splitting).is_err());
    }

    #[test]
    fn failed_split_returns_to_idle_without_marking_split() {
        let mut task = sample_task();
        task.begin(TaskStatus::Splitting).expect("begin split");
        task.finish(false).expect("finish");

        assert_eq!(task.status, TaskStatus::Idle);
        assert!(!task.is_split());
    }

    #[test]
    fn split_flag_survives_a_failed_resplit() {
        let mut task = sample_task();
        task.begin(TaskStatus::Splitting).expect("begin split");
        task.finish(true).expect("finish");
        assert_eq!(task.status, TaskStatus::Split);

        task.begin(TaskStatus::Splitting).expect("resplit");
        assert!(task.is_split());
        task.finish(false).expect("finish");

        assert!(task.is_split());
        assert_eq!(task.status, TaskStatus::Split);
    }

    #[test]
    fn split_task_rejects_detection() {
        let mut task = sample_task();
        task.begin(TaskStatus::Splitting).expect("begin split");
        task.finish(true).expect("finish");

        assert!(matches!(
            task.begin(TaskStatus::Detecting),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn finish_without_busy_phase_is_invalid() {
        let mut task = sample_task();
        assert!(task.finish(true).is_err());
    }
}
