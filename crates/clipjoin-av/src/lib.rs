//! # clipjoin-av
//!
//! External media tool layer for clipjoin.
//!
//! This crate provides functionality for:
//! - Locating ffmpeg and ffprobe and reporting their versions
//! - Running tools with captured output and an optional time limit
//! - Losslessly concatenating fragments with the ffmpeg concat demuxer
//! - Probing container duration and size with ffprobe
//! - Scratch workspaces so partial outputs never reach the destination
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use clipjoin_av::{concat, resolve_tool, ConcatOptions};
//! use std::path::{Path, PathBuf};
//!
//! let ffmpeg = resolve_tool("ffmpeg", None)?;
//! let inputs = vec![
//!     PathBuf::from("/footage/DJI_0001_001.MP4"),
//!     PathBuf::from("/footage/DJI_0001_002.MP4"),
//! ];
//! let joined = concat(
//!     &ffmpeg,
//!     &inputs,
//!     Path::new("/footage/processed/DJI_0001.MP4"),
//!     &ConcatOptions::default(),
//! )?;
//! println!("{} ({} bytes)", joined.path.display(), joined.size);
//! # Ok::<(), clipjoin_av::Error>(())
//! ```

mod error;
pub mod command;
pub mod concat;
pub mod probe;
pub mod template;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use concat::{concat, ConcatOptions, ConcatOutput};
pub use error::{Error, Result};
pub use probe::{probe_format, FormatInfo};
pub use template::TemplateContext;
pub use tools::{check_tool, check_tools, resolve_tool, ToolInfo, ToolPaths};
pub use workspace::Workspace;
