//! Black interval parsing and cut-point synthesis.
//!
//! FFmpeg's `blackdetect` filter reports each interval as a log line such as
//! `[blackdetect @ 0x..] black_start:1.468 black_end:2.302 black_duration:0.834`.
//! Lines may be interleaved with unrelated diagnostics and are not assumed to
//! arrive in chronological order.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::cut_point::{CutPoint, sort_by_time};

static BLACK_INTERVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"black_start:\s*([0-9]+(?:\.[0-9]+)?)\s+black_end:\s*([0-9]+(?:\.[0-9]+)?)\s+black_duration:\s*([0-9]+(?:\.[0-9]+)?)",
    )
    .expect("black interval pattern is valid")
});

/// One span of near-black frames reported by the analysis pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackInterval {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl BlackInterval {
    pub fn midpoint(&self) -> f64 {
        self.start + self.duration / 2.0
    }
}

/// Extracts every `black_start / black_end / black_duration` triple from
/// `diagnostics`, in text order.
///
/// # Example
/// ```
/// use engine::detect::parse_black_intervals;
///
/// let log = "[blackdetect @ 0x1] black_start:1.5 black_end:2.5 black_duration:1";
/// let intervals = parse_black_intervals(log);
/// assert_eq!(intervals.len(), 1);
/// assert_eq!(intervals[0].midpoint(), 2.0);
/// ```
pub fn parse_black_intervals(diagnostics: &str) -> Vec<BlackInterval> {
    BLACK_INTERVAL_PATTERN
        .captures_iter(diagnostics)
        .filter_map(|captures| {
            Some(BlackInterval {
                start: captures.get(1)?.as_str().parse().ok()?,
                end: captures.get(2)?.as_str().parse().ok()?,
                duration: captures.get(3)?.as_str().parse().ok()?,
            })
        })
        .collect()
}

/// Turns intervals into midpoint cut points: de-duplicated on exact time,
/// sorted ascending, then thinned so each kept point lies at least
/// `min_slice_duration` after the previous one (the first is measured from 0).
///
/// # Example
/// ```
/// use engine::detect::{BlackInterval, synthesize_cut_points};
///
/// let intervals = [
///     BlackInterval { start: 10.0, end: 10.2, duration: 0.2 },
///     BlackInterval { start: 50.0, end: 50.3, duration: 0.3 },
///     BlackInterval { start: 51.0, end: 51.1, duration: 0.1 },
/// ];
/// let points = synthesize_cut_points(&intervals, 5.0);
/// assert_eq!(points.len(), 2);
/// ```
pub fn synthesize_cut_points(intervals: &[BlackInterval], min_slice_duration: f64) -> Vec<CutPoint> {
    let mut candidates = Vec::<CutPoint>::with_capacity(intervals.len());
    for interval in intervals {
        let time = interval.midpoint();
        if candidates.iter().any(|candidate| candidate.time == time) {
            continue;
        }
        candidates.push(CutPoint::new(time, Some(interval.duration)));
    }

    sort_by_time(&mut candidates);
    let kept = enforce_min_spacing(candidates, min_slice_duration);

    debug!(
        intervals = intervals.len(),
        kept = kept.len(),
        min_slice_duration,
        "cut points synthesized"
    );
    kept
}

fn enforce_min_spacing(sorted: Vec<CutPoint>, min_slice_duration: f64) -> Vec<CutPoint> {
    let mut last_kept_time = 0.0;
    sorted
        .into_iter()
        .filter(|candidate| {
            if candidate.time - last_kept_time >= min_slice_duration {
                last_kept_time = candidate.time;
                true
            } else {
                false
            }
        })
        .collect()
}
