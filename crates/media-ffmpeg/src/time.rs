use crate::error::{MediaFfmpegError, Result};

/// Rejects negative, NaN and infinite second offsets.
///
/// # Example
/// ```
/// use media_ffmpeg::validate_seconds;
///
/// assert!(validate_seconds(1.5).is_ok());
/// assert!(validate_seconds(-0.1).is_err());
/// ```
pub fn validate_seconds(seconds: f64) -> Result<f64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(MediaFfmpegError::InvalidTimestampSeconds(seconds));
    }
    Ok(seconds)
}

/// Formats seconds for FFmpeg time arguments with microsecond precision.
///
/// Trailing zeros are dropped so command lines stay readable.
///
/// # Example
/// ```
/// use media_ffmpeg::format_seconds;
///
/// assert_eq!(format_seconds(50.15), "50.15");
/// assert_eq!(format_seconds(3.0), "3");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    let fixed = format!("{seconds:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
