//! Black-frame cut-point engine: detection, previews, editing, splitting and
//! durable task state.

pub mod api;
pub mod backend;
pub mod config;
pub mod cut_point;
pub mod detect;
pub mod error;
pub mod preview;
pub mod segment;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use api::{Command, Engine, EngineErrorEvent, EngineErrorKind, Event, TaskSnapshot};
pub use backend::{FfmpegMediaBackend, MediaBackend};
pub use config::{Settings, SettingsManager};
pub use cut_point::{ArtifactKind, ArtifactState, CutPoint, CutPointList, PreviewArtifacts};
pub use error::{EngineError, Result};
pub use store::{TaskState, TaskStore};
pub use task::{Task, TaskStatus};
