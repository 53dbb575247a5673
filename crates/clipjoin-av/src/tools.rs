//! External tool detection.
//!
//! Tools are resolved from an explicitly configured path when that path
//! exists, otherwise from `PATH`.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Tools clipjoin shells out to, with the flag that prints their version.
const KNOWN_TOOLS: &[(&str, &str)] = &[("ffmpeg", "-version"), ("ffprobe", "-version")];

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of the version banner, if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Configured executable locations; `None` means "look it up in PATH".
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ToolPaths {
    fn configured(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg.as_deref(),
            "ffprobe" => self.ffprobe.as_deref(),
            _ => None,
        }
    }
}

/// Resolve a tool, preferring a configured path over PATH lookup.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] when neither the configured path nor PATH
/// yields an executable.
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "configured {} path {} does not exist, searching PATH",
            name,
            path.display()
        );
    }

    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Check a single tool and read its version banner.
pub fn check_tool(name: &str, version_arg: &str, configured: Option<&Path>) -> ToolInfo {
    let Ok(path) = resolve_tool(name, configured) else {
        return ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        };
    };

    match Command::new(&path).arg(version_arg).output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: Some(path),
        },
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: Some(path),
        },
    }
}

/// Check every tool clipjoin uses.
pub fn check_tools(paths: &ToolPaths) -> Vec<ToolInfo> {
    KNOWN_TOOLS
        .iter()
        .map(|&(name, version_arg)| check_tool(name, version_arg, paths.configured(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool("nonexistent_tool_12345", "--version", None);
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn test_resolve_missing_tool() {
        let err = resolve_tool("nonexistent_tool_12345", None).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_resolve_prefers_existing_configured_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = resolve_tool("nonexistent_tool_12345", Some(file.path())).unwrap();
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn test_resolve_ignores_missing_configured_path() {
        let result = resolve_tool(
            "nonexistent_tool_12345",
            Some(Path::new("/nonexistent/dir/tool")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_check_tools_lists_known_tools() {
        let infos = check_tools(&ToolPaths::default());
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
    }
}
