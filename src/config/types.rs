use clipjoin_common::GroupingRules;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub grouping: GroupingRules,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory the camera footage is read from (e.g. a mounted card)
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Local directory fragments are copied into before joining
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Directory joined recordings are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./processed")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            staging_dir: None,
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamingConfig {
    /// Output name template; supports `{key}`, `{index}` and `{count}`
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_template() -> String {
    "{key}".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Kill a tool after this many seconds (unset = no limit)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn tool_paths(&self) -> clipjoin_av::ToolPaths {
        clipjoin_av::ToolPaths {
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Empty the staging directory before copying
    #[serde(default = "default_true")]
    pub clear_staging: bool,

    /// Delete staged fragments once their group joined successfully
    #[serde(default = "default_true")]
    pub cleanup_fragments: bool,

    /// Probe joined files with ffprobe for their duration
    #[serde(default = "default_true")]
    pub probe_duration: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clear_staging: true,
            cleanup_fragments: true,
            probe_duration: true,
        }
    }
}
