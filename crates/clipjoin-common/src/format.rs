//! Human-readable formatting for sizes and durations.

use std::time::Duration;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Format a byte count using binary (1024) steps.
///
/// # Examples
///
/// ```
/// use clipjoin_common::format::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 B");
/// assert_eq!(format_file_size(512), "512 B");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(4 * 1024 * 1024 * 1024), "4.0 GB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", size, SIZE_UNITS[unit])
    }
}

/// Format a duration as `SSs` below one minute, `HH:MM:SS` otherwise.
///
/// # Examples
///
/// ```
/// use clipjoin_common::format::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(7)), "07s");
/// assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{secs:02}s");
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
