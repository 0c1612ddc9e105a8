//! Pipeline settings persisted as `settings.json` in the tasks root.
//!
//! Loading is tolerant: a missing file yields defaults, a malformed one is
//! logged and replaced by defaults, and out-of-range values are clamped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use media_ffmpeg::BlackDetectParams;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// Settings file name inside the tasks root.
pub const SETTINGS_FILE: &str = "settings.json";

/// Global pipeline policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Minimum spacing between detected cut points, in seconds.
    pub min_slice_duration: f64,
    /// Shortest black interval the analysis pass reports, in seconds.
    pub black_min_duration: f64,
    /// Pixel luminance ratio treated as black (0.0 - 1.0).
    pub black_pixel_threshold: f64,
    /// Distance of the before/after stills from the cut point, in seconds.
    pub preview_offset: f64,
    /// Length of each hover clip, in seconds.
    pub hover_duration: f64,
    /// Half-width of the fine-adjustment window around `originalTime`.
    pub fine_adjust_range: f64,
    /// Cut points processed concurrently during preview generation.
    pub preview_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_slice_duration: 5.0,
            black_min_duration: 0.1,
            black_pixel_threshold: 0.10,
            preview_offset: 1.0,
            hover_duration: 2.0,
            fine_adjust_range: 2.0,
            preview_workers: 1,
        }
    }
}

impl Settings {
    /// Clamps every value into its supported range, replacing non-finite
    /// numbers with defaults.
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        self.min_slice_duration =
            clamp_f64(self.min_slice_duration, 0.0, 3_600.0, defaults.min_slice_duration);
        self.black_min_duration =
            clamp_f64(self.black_min_duration, 0.01, 60.0, defaults.black_min_duration);
        self.black_pixel_threshold = clamp_f64(
            self.black_pixel_threshold,
            0.0,
            1.0,
            defaults.black_pixel_threshold,
        );
        self.preview_offset = clamp_f64(self.preview_offset, 0.0, 60.0, defaults.preview_offset);
        self.hover_duration = clamp_f64(self.hover_duration, 0.1, 30.0, defaults.hover_duration);
        self.fine_adjust_range =
            clamp_f64(self.fine_adjust_range, 0.0, 600.0, defaults.fine_adjust_range);
        self.preview_workers = self.preview_workers.clamp(1, 16);
    }

    pub fn black_detect_params(&self) -> BlackDetectParams {
        BlackDetectParams {
            min_duration: self.black_min_duration,
            pixel_threshold: self.black_pixel_threshold,
        }
    }
}

fn clamp_f64(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

/// Loads and saves [`Settings`] for one tasks root.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    pub fn new(tasks_root: impl AsRef<Path>) -> Self {
        Self {
            settings_path: tasks_root.as_ref().join(SETTINGS_FILE),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Reads settings, falling back to defaults on any problem.
    pub fn load(&self) -> Settings {
        if !self.settings_path.exists() {
            info!(path = ?self.settings_path, "settings file not found, using defaults");
            return Settings::default();
        }

        let parsed = fs::read_to_string(&self.settings_path)
            .map_err(|error| error.to_string())
            .and_then(|content| {
                serde_json::from_str::<Settings>(&content).map_err(|error| error.to_string())
            });

        match parsed {
            Ok(mut settings) => {
                settings.normalize();
                settings
            }
            Err(error) => {
                warn!(path = ?self.settings_path, %error, "failed to load settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Normalizes and atomically writes `settings`, returning what was stored.
    pub fn save(&self, settings: &Settings) -> Result<Settings> {
        let mut normalized = settings.clone();
        normalized.normalize();

        let content = serde_json::to_string_pretty(&normalized).map_err(|source| {
            EngineError::StateSerialization {
                path: self.settings_path.clone(),
                source,
            }
        })?;
        write_atomically(&self.settings_path, content.as_bytes())?;

        info!(path = ?self.settings_path, "settings saved");
        Ok(normalized)
    }
}

/// Writes `bytes` to `path` via a synced temp file and a rename, so readers
/// see either the old or the new content, never a torn write.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(state_io("create state directory", parent))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file =
        fs::File::create(&temp_path).map_err(state_io("create temp state file", &temp_path))?;
    file.write_all(bytes)
        .map_err(state_io("write temp state file", &temp_path))?;
    file.sync_all()
        .map_err(state_io("sync temp state file", &temp_path))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(state_io("replace state file", path))
}

/// Builds a `map_err` adapter for filesystem failures on `path`.
pub(crate) fn state_io(
    context: &'static str,
    path: &Path,
) -> impl FnOnce(std::io::Error) -> EngineError + use<> {
    let path = path.to_path_buf();
    move |source| EngineError::StateIo {
        context,
        path,
        source,
    }
}
