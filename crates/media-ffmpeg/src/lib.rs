mod blackdetect;
mod error;
mod extract;
mod probe;
mod process;
mod split;
mod time;

pub use blackdetect::{BlackDetectParams, detect_black_frames};
pub use error::{MediaFfmpegError, Result};
pub use extract::{CLIP_FILTER_CHAIN, extract_clip, extract_still};
pub use probe::probe_duration_seconds;
pub use split::{SegmentSplitRequest, split_segments, stream_copy};
pub use time::{format_seconds, validate_seconds};
