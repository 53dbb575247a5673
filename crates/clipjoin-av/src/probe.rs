//! FFprobe-based container probing.

use crate::command::ToolCommand;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

/// Container-level facts about a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatInfo {
    /// Demuxer name(s) reported by ffprobe, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub container: Option<String>,
    /// Playback duration.
    pub duration: Option<Duration>,
    /// File size in bytes as reported by ffprobe.
    pub size: Option<u64>,
}

/// Probe the container of `path` with the given ffprobe executable.
pub fn probe_format(ffprobe: &Path, path: &Path, timeout: Option<Duration>) -> Result<FormatInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = ToolCommand::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .timeout(timeout)
        .execute()?;

    parse_ffprobe_output(&output.stdout)
}

fn parse_ffprobe_output(json: &str) -> Result<FormatInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::parse_error("ffprobe", e.to_string()))?;

    let duration = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    Ok(FormatInfo {
        container: output.format.format_name,
        duration,
        size: output.format.size.and_then(|s| s.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        let json = r#"{
            "format": {
                "filename": "/out/DJI_0001.MP4",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "1234.567000",
                "size": "4294967296"
            }
        }"#;
        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.container.as_deref(), Some("mov,mp4,m4a,3gp,3g2,mj2"));
        assert_eq!(info.duration, Some(Duration::from_secs_f64(1234.567)));
        assert_eq!(info.size, Some(4_294_967_296));
    }

    #[test]
    fn test_parse_missing_fields() {
        let info = parse_ffprobe_output(r#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(info.container, None);
        assert_eq!(info.duration, None);
        assert_eq!(info.size, None);
    }

    #[test]
    fn test_parse_out_of_range_duration() {
        for duration in ["1e30", "-5", "inf", "NaN"] {
            let json = format!(r#"{{"format": {{"duration": "{duration}"}}}}"#);
            let info = parse_ffprobe_output(&json).unwrap();
            assert_eq!(info.duration, None, "duration {duration}");
        }
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_ffprobe_output("not json").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe_format(
            Path::new("ffprobe"),
            Path::new("/nonexistent/clip.MP4"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
