//! Join executor: turns one ordered list of fragments into a single file.

use crate::config::Config;
use clipjoin_av::{concat, probe_format, resolve_tool, ConcatOptions, ToolPaths};
use clipjoin_common::paths::is_plain_file_name;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A successfully joined recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedFile {
    pub path: PathBuf,
    pub size: u64,
    /// Playback duration, when probing was enabled and succeeded
    pub duration: Option<Duration>,
    /// Number of fragments that went into the file
    pub inputs: usize,
}

/// Why a join did not produce a usable file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinFailure {
    /// The tool is missing or cannot be executed.
    #[error("{tool} is not available: {message}")]
    ToolUnavailable { tool: String, message: String },

    /// The tool ran and exited unsuccessfully.
    #[error("{tool} failed: {diagnostics}")]
    ToolExit { tool: String, diagnostics: String },

    /// The tool exceeded the configured time limit.
    #[error("{tool} timed out after {}s", after.as_secs())]
    TimedOut { tool: String, after: Duration },

    /// The tool reported success but the output is missing or empty.
    #[error("output check failed for {}: {message}", path.display())]
    OutputIntegrity { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid join request: {0}")]
    InvalidRequest(String),
}

impl JoinFailure {
    /// Short category label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolUnavailable { .. } => "tool unavailable",
            Self::ToolExit { .. } => "tool error",
            Self::TimedOut { .. } => "timeout",
            Self::OutputIntegrity { .. } => "output integrity",
            Self::Filesystem(_) => "filesystem",
            Self::InvalidRequest(_) => "invalid request",
        }
    }
}

impl From<clipjoin_av::Error> for JoinFailure {
    fn from(err: clipjoin_av::Error) -> Self {
        use clipjoin_av::Error;

        match err {
            Error::ToolNotFound { tool } => Self::ToolUnavailable {
                tool,
                message: "not found in the configured location or PATH".to_string(),
            },
            Error::ToolSpawn { tool, source } => Self::ToolUnavailable {
                tool,
                message: source.to_string(),
            },
            Error::ToolFailed { tool, message } | Error::ParseError { tool, message } => {
                Self::ToolExit {
                    tool,
                    diagnostics: message,
                }
            }
            Error::Timeout { tool, after } => Self::TimedOut { tool, after },
            Error::OutputIntegrity { path, message } => Self::OutputIntegrity { path, message },
            Error::FileNotFound { path } => {
                Self::Filesystem(format!("input not found: {}", path.display()))
            }
            Error::Io(e) => Self::Filesystem(e.to_string()),
            Error::Workspace(message) => Self::Filesystem(message),
            Error::InvalidInput(message) => Self::InvalidRequest(message),
        }
    }
}

/// Result of one join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Success(JoinedFile),
    Failure(JoinFailure),
}

impl JoinOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn joined(&self) -> Option<&JoinedFile> {
        match self {
            Self::Success(joined) => Some(joined),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&JoinFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl From<Result<JoinedFile, JoinFailure>> for JoinOutcome {
    fn from(result: Result<JoinedFile, JoinFailure>) -> Self {
        match result {
            Ok(joined) => Self::Success(joined),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// Something that can join fragments into one file.
///
/// Implementations never panic on bad requests; every problem is reported
/// as a [`JoinOutcome::Failure`].
pub trait Joiner {
    /// Join `inputs`, in the given order, into `<output_dir>/<destination_name>.<ext>`.
    fn join(&self, inputs: &[PathBuf], destination_name: &str, output_dir: &Path) -> JoinOutcome;
}

/// [`Joiner`] backed by the ffmpeg concat demuxer in stream-copy mode.
#[derive(Debug, Clone)]
pub struct FfmpegJoiner {
    tools: ToolPaths,
    timeout: Option<Duration>,
    extension: String,
    probe_duration: bool,
}

impl FfmpegJoiner {
    /// Joiner writing files with the given container extension.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            tools: ToolPaths::default(),
            timeout: None,
            extension: extension.into(),
            probe_duration: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.grouping.extension.clone())
            .with_tools(config.tools.tool_paths())
            .with_timeout(config.tools.timeout())
            .with_probe_duration(config.run.probe_duration)
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_duration(mut self, enabled: bool) -> Self {
        self.probe_duration = enabled;
        self
    }

    /// Where a join named `destination_name` lands.
    pub fn destination(&self, output_dir: &Path, destination_name: &str) -> PathBuf {
        output_dir.join(format!("{}.{}", destination_name, self.extension))
    }

    fn try_join(
        &self,
        inputs: &[PathBuf],
        destination_name: &str,
        output_dir: &Path,
    ) -> Result<JoinedFile, JoinFailure> {
        if inputs.is_empty() {
            return Err(JoinFailure::InvalidRequest(
                "no input fragments given".to_string(),
            ));
        }
        if !is_plain_file_name(destination_name) {
            return Err(JoinFailure::InvalidRequest(format!(
                "'{}' is not a plain file name",
                destination_name
            )));
        }

        let ffmpeg = resolve_tool("ffmpeg", self.tools.ffmpeg.as_deref())?;
        let destination = self.destination(output_dir, destination_name);
        let output = concat(
            &ffmpeg,
            inputs,
            &destination,
            &ConcatOptions {
                timeout: self.timeout,
            },
        )?;

        let duration = if self.probe_duration {
            self.probe_joined_duration(&output.path)
        } else {
            None
        };

        Ok(JoinedFile {
            path: output.path,
            size: output.size,
            duration,
            inputs: inputs.len(),
        })
    }

    /// Best-effort duration lookup; failures only get logged.
    fn probe_joined_duration(&self, path: &Path) -> Option<Duration> {
        let ffprobe = match resolve_tool("ffprobe", self.tools.ffprobe.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("Skipping duration probe: {}", e);
                return None;
            }
        };

        match probe_format(&ffprobe, path, self.timeout) {
            Ok(info) => info.duration,
            Err(e) => {
                tracing::warn!("Could not probe duration of {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Joiner for FfmpegJoiner {
    fn join(&self, inputs: &[PathBuf], destination_name: &str, output_dir: &Path) -> JoinOutcome {
        tracing::debug!(
            "Joining {} fragment(s) as {} into {:?}",
            inputs.len(),
            destination_name,
            output_dir
        );
        self.try_join(inputs, destination_name, output_dir).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_destination_path() {
        let joiner = FfmpegJoiner::new("MP4");
        assert_eq!(
            joiner.destination(Path::new("/out"), "DJI_0001"),
            PathBuf::from("/out/DJI_0001.MP4")
        );
    }

    #[test]
    fn test_empty_inputs_is_invalid_request() {
        let dir = tempdir().unwrap();
        let outcome = FfmpegJoiner::new("MP4").join(&[], "DJI_0001", dir.path());
        assert_matches!(outcome, JoinOutcome::Failure(JoinFailure::InvalidRequest(_)));
    }

    #[test]
    fn test_separator_in_name_is_invalid_request() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("DJI_0001_001.MP4");
        std::fs::write(&input, b"x").unwrap();

        for name in ["../escape", "a/b", "", ".."] {
            let outcome = FfmpegJoiner::new("MP4").join(&[input.clone()], name, dir.path());
            assert_matches!(
                outcome,
                JoinOutcome::Failure(JoinFailure::InvalidRequest(_)),
                "name {name:?}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unexecutable_tool_is_tool_unavailable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let ffmpeg = dir.path().join("ffmpeg");
        std::fs::write(&ffmpeg, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o644)).unwrap();
        let input = dir.path().join("DJI_0001_001.MP4");
        std::fs::write(&input, b"x").unwrap();

        let joiner = FfmpegJoiner::new("MP4").with_tools(ToolPaths {
            ffmpeg: Some(ffmpeg),
            ffprobe: None,
        });
        let outcome = joiner.join(&[input], "DJI_0001", &dir.path().join("out"));
        assert_matches!(
            outcome,
            JoinOutcome::Failure(JoinFailure::ToolUnavailable { ref tool, .. }) if tool == "ffmpeg"
        );
        assert!(!dir.path().join("out/DJI_0001.MP4").exists());
    }

    #[test]
    fn test_failure_mapping() {
        assert_matches!(
            JoinFailure::from(clipjoin_av::Error::tool_failed("ffmpeg", "exited with 1")),
            JoinFailure::ToolExit { ref diagnostics, .. } if diagnostics == "exited with 1"
        );
        assert_matches!(
            JoinFailure::from(clipjoin_av::Error::output_integrity("/o/A.MP4", "empty")),
            JoinFailure::OutputIntegrity { .. }
        );
        assert_matches!(
            JoinFailure::from(clipjoin_av::Error::Timeout {
                tool: "ffmpeg".to_string(),
                after: Duration::from_secs(5),
            }),
            JoinFailure::TimedOut { .. }
        );
        assert_matches!(
            JoinFailure::from(clipjoin_av::Error::file_not_found("/in/A.MP4")),
            JoinFailure::Filesystem(_)
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let joined = JoinedFile {
            path: PathBuf::from("/out/A.MP4"),
            size: 10,
            duration: None,
            inputs: 2,
        };
        let ok = JoinOutcome::Success(joined.clone());
        assert!(ok.is_success());
        assert_eq!(ok.joined(), Some(&joined));
        assert!(ok.failure().is_none());

        let failed = JoinOutcome::Failure(JoinFailure::Filesystem("disk full".to_string()));
        assert!(!failed.is_success());
        assert_eq!(failed.failure().map(JoinFailure::kind), Some("filesystem"));
    }
}
