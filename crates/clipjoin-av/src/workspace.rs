//! Scratch workspace for a single join.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of scratch directories; hidden so listings skip them.
const SCRATCH_PREFIX: &str = ".clipjoin-";

/// Workspace for one join.
///
/// The scratch directory lives inside the destination directory so the
/// final move is a same-filesystem rename. Nothing appears at the
/// destination until [`Workspace::finalize`] succeeds; dropping the
/// workspace discards everything.
///
/// # Example
///
/// ```no_run
/// use clipjoin_av::Workspace;
///
/// let workspace = Workspace::new("/footage/processed/DJI_0001.MP4")?;
/// // ... write the joined file to workspace.output() ...
/// workspace.finalize()?;
/// # Ok::<(), clipjoin_av::Error>(())
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    destination: PathBuf,
    output_path: PathBuf,
}

impl Workspace {
    /// Create a workspace for producing `destination`.
    ///
    /// The destination's parent directory is created if missing.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let file_name = destination
            .file_name()
            .ok_or_else(|| Error::InvalidInput("destination has no file name".to_string()))?
            .to_owned();
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        std::fs::create_dir_all(&parent)?;
        let temp_dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| {
                Error::Workspace(format!(
                    "failed to create scratch dir in {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        let output_path = temp_dir.path().join(file_name);

        Ok(Self {
            temp_dir,
            destination,
            output_path,
        })
    }

    /// Final location of the output.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Where the tool should write its output.
    pub fn output(&self) -> &Path {
        &self.output_path
    }

    /// The scratch directory path.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for an intermediate file inside the scratch directory.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Move the output to the destination, replacing any previous file.
    ///
    /// An existing destination is first renamed to a `.bak` sibling and
    /// restored if the move fails.
    pub fn finalize(self) -> Result<PathBuf> {
        if !self.output_path.exists() {
            return Err(Error::Workspace(format!(
                "output file does not exist: {}",
                self.output_path.display()
            )));
        }

        let dest = &self.destination;
        if dest.exists() {
            let mut backup = dest.clone().into_os_string();
            backup.push(".bak");
            let backup = PathBuf::from(backup);

            std::fs::rename(dest, &backup).map_err(|e| {
                Error::Workspace(format!("failed to back up {}: {}", dest.display(), e))
            })?;

            if let Err(e) = std::fs::rename(&self.output_path, dest) {
                let _ = std::fs::rename(&backup, dest);
                return Err(Error::Workspace(format!(
                    "failed to move output to {}: {}",
                    dest.display(),
                    e
                )));
            }

            let _ = std::fs::remove_file(&backup);
        } else {
            std::fs::rename(&self.output_path, dest).map_err(|e| {
                Error::Workspace(format!(
                    "failed to move output to {}: {}",
                    dest.display(),
                    e
                ))
            })?;
        }

        Ok(self.destination)
    }
}
