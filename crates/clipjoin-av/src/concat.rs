//! Lossless concatenation with the ffmpeg concat demuxer.
//!
//! Inputs are stream-copied in the given order into a scratch file next to
//! the destination. The destination only appears once ffmpeg has exited
//! cleanly and the result passed the integrity check.

use crate::command::ToolCommand;
use crate::workspace::Workspace;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the demuxer list file inside the scratch directory.
const LIST_FILE_NAME: &str = "concat.txt";

/// Options for a concat run.
#[derive(Debug, Clone, Default)]
pub struct ConcatOptions {
    /// Kill ffmpeg after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Result of a successful concat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOutput {
    /// Final location of the joined file.
    pub path: PathBuf,
    /// Size of the joined file in bytes.
    pub size: u64,
}

/// Join `inputs`, in order, into `destination` using `ffmpeg`.
///
/// An existing file at `destination` is replaced only on success.
///
/// # Errors
///
/// - [`Error::InvalidInput`] for an empty input list or non-UTF-8 paths.
/// - [`Error::FileNotFound`] if an input is missing.
/// - Any [`ToolCommand::execute`] error.
/// - [`Error::OutputIntegrity`] if ffmpeg exits cleanly but leaves no usable output.
pub fn concat(
    ffmpeg: &Path,
    inputs: &[PathBuf],
    destination: &Path,
    options: &ConcatOptions,
) -> Result<ConcatOutput> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput("no input files to join".to_string()));
    }

    let mut absolute = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.is_file() {
            return Err(Error::file_not_found(input));
        }
        absolute.push(std::fs::canonicalize(input)?);
    }

    let workspace = Workspace::new(destination)?;
    let list = workspace.temp_file(LIST_FILE_NAME);
    std::fs::write(&list, concat_list(&absolute)?)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "joining {} file(s) into {}",
        absolute.len(),
        destination.display()
    );

    ToolCommand::new(ffmpeg)
        .args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ])
        .arg(&list)
        .args(["-c", "copy"])
        .arg(workspace.output())
        .timeout(options.timeout)
        .execute()?;

    let size = verify_output(workspace.output(), workspace.destination())?;
    let path = workspace.finalize()?;

    Ok(ConcatOutput { path, size })
}

/// Render the demuxer list for `inputs`, one `file '<path>'` line each.
///
/// Single quotes inside a path are written as `'\''`.
pub fn concat_list(inputs: &[PathBuf]) -> Result<String> {
    let mut list = String::new();
    for input in inputs {
        let path = input.to_str().ok_or_else(|| {
            Error::InvalidInput(format!("path is not valid UTF-8: {}", input.display()))
        })?;
        list.push_str("file '");
        list.push_str(&path.replace('\'', r"'\''"));
        list.push_str("'\n");
    }
    Ok(list)
}

/// Check the scratch output, reporting problems against `destination`.
fn verify_output(output: &Path, destination: &Path) -> Result<u64> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        Ok(meta) if meta.is_file() => Err(Error::output_integrity(
            destination,
            "ffmpeg reported success but the output is empty",
        )),
        Ok(_) => Err(Error::output_integrity(
            destination,
            "output is not a regular file",
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::output_integrity(
            destination,
            "ffmpeg reported success but wrote no output",
        )),
        Err(e) => Err(Error::Io(e)),
    }
}
