//! Filesystem side of a run: listing footage, staging copies and cleanup.

use anyhow::{Context, Result};
use clipjoin_common::paths::is_plain_file_name;
use clipjoin_common::Classifier;
use std::fs;
use std::path::{Path, PathBuf};

/// Cumulative copy progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyProgress<'a> {
    /// File that was just copied
    pub name: &'a str,
    pub files_done: usize,
    pub files_total: usize,
    pub bytes_done: u64,
    pub bytes_total: u64,
}

/// Totals of a finished copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub bytes: u64,
}

/// Ensure `path` exists and is a directory.
pub fn validate_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Directory does not exist: {:?}", path);
    }
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {:?}", path);
    }
    Ok(())
}

/// Create `path` (and parents) if missing.
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))
}

/// Fail unless `source` and `staging` are unrelated directories.
///
/// Both paths are resolved through symlinks, `.` and relative spellings, so
/// an alias of the source can never be cleared or cleaned up as staging.
/// Neither may contain the other. `staging` does not have to exist yet.
pub fn ensure_separate_directories(source: &Path, staging: &Path) -> Result<()> {
    let source_real = resolve_path(source)?;
    let staging_real = resolve_path(staging)?;

    if source_real.starts_with(&staging_real) || staging_real.starts_with(&source_real) {
        anyhow::bail!(
            "Staging directory {:?} overlaps the source directory {:?}",
            staging,
            source
        );
    }
    Ok(())
}

/// Canonical form of `path`, resolving its longest existing prefix.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        match fs::canonicalize(existing) {
            Ok(mut real) => {
                real.extend(missing.iter().rev());
                return Ok(real);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e).with_context(|| format!("Failed to resolve path: {:?}", path));
                };
                missing.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to resolve path: {:?}", path))
            }
        }
    }
}

/// Names of the regular files directly inside `dir`, sorted.
///
/// Hidden entries and names that are not valid UTF-8 are skipped.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if name.starts_with('.') => {}
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!("Skipping non UTF-8 file name {:?}", raw),
        }
    }

    names.sort();
    Ok(names)
}

/// Video files directly inside `dir`, sorted.
pub fn list_video_files(dir: &Path, classifier: &Classifier) -> Result<Vec<String>> {
    Ok(list_file_names(dir)?
        .into_iter()
        .filter(|name| classifier.is_video(name))
        .collect())
}

/// Remove everything inside `dir`, keeping `dir` itself.
///
/// Entries that cannot be removed are logged and skipped. Returns the number
/// of entries removed.
pub fn clear_directory(dir: &Path) -> Result<usize> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let result = match entry.file_type() {
            Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove {:?}: {}", path, e),
        }
    }

    tracing::debug!("Cleared {} entries from {:?}", removed, dir);
    Ok(removed)
}

/// Combined size of `names` inside `dir`; missing files count as zero.
pub fn total_size<S: AsRef<str>>(dir: &Path, names: &[S]) -> u64 {
    names
        .iter()
        .filter_map(|name| fs::metadata(dir.join(name.as_ref())).ok())
        .map(|meta| meta.len())
        .sum()
}

/// Copy `names` from `src` to `dest`, reporting progress after each file.
///
/// The first failing file aborts the copy.
pub fn copy_files<S, F>(src: &Path, dest: &Path, names: &[S], mut progress: F) -> Result<CopyStats>
where
    S: AsRef<str>,
    F: FnMut(&CopyProgress<'_>),
{
    ensure_directory(dest)?;

    let bytes_total = total_size(src, names);
    let mut stats = CopyStats::default();

    for name in names {
        let name = name.as_ref();
        let from = src.join(name);
        let to = dest.join(name);
        let bytes = fs::copy(&from, &to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        stats.files += 1;
        stats.bytes += bytes;
        progress(&CopyProgress {
            name,
            files_done: stats.files,
            files_total: names.len(),
            bytes_done: stats.bytes,
            bytes_total,
        });
    }

    Ok(stats)
}

/// Delete `names` from `dir`.
///
/// Only plain file names are accepted, so nothing outside `dir` can be
/// touched. Already-missing files are not an error; other failures are
/// logged and skipped. Returns the number of files deleted.
pub fn delete_files<S: AsRef<str>>(dir: &Path, names: &[S]) -> usize {
    let mut deleted = 0;
    for name in names {
        let name = name.as_ref();
        if !is_plain_file_name(name) {
            tracing::warn!("Refusing to delete suspicious name {:?}", name);
            continue;
        }
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => deleted += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to delete {:?}: {}", path, e),
        }
    }
    deleted
}

/// Bytes available to unprivileged users on the filesystem holding `dir`.
#[cfg(unix)]
pub fn available_space(dir: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(dir)
        .with_context(|| format!("Failed to query free space of {:?}", dir))?;
    Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64))
}

#[cfg(not(unix))]
pub fn available_space(dir: &Path) -> Result<u64> {
    anyhow::bail!("Free space query is not supported on this platform: {:?}", dir)
}

/// Warn when `dir` has less than `required` bytes free.
///
/// Returns false only when the space is known to be insufficient.
pub fn check_disk_space(dir: &Path, required: u64) -> bool {
    match available_space(dir) {
        Ok(available) if available < required => {
            tracing::warn!(
                "Only {} free in {:?}, about {} needed",
                clipjoin_common::format::format_file_size(available),
                dir,
                clipjoin_common::format::format_file_size(required)
            );
            false
        }
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("Skipping disk space check: {:#}", e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipjoin_common::GroupingRules;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, bytes: &[u8]) {
        fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn test_validate_directory() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "file.MP4", b"x");

        assert!(validate_directory(dir.path()).is_ok());
        assert!(validate_directory(&dir.path().join("missing")).is_err());
        assert!(validate_directory(&dir.path().join("file.MP4")).is_err());
    }

    #[test]
    fn test_separate_directories_accepts_siblings() {
        let root = tempdir().unwrap();
        let source = root.path().join("card");
        fs::create_dir(&source).unwrap();

        assert!(ensure_separate_directories(&source, &root.path().join("staging")).is_ok());
        assert!(ensure_separate_directories(&source, &root.path().join("new/staging")).is_ok());
    }

    #[test]
    fn test_separate_directories_rejects_overlap() {
        let root = tempdir().unwrap();
        let source = root.path().join("card");
        fs::create_dir(&source).unwrap();

        for staging in [
            source.clone(),
            source.join("."),
            root.path().join("card/../card"),
            root.path().to_path_buf(),
            source.join("staging"),
            source.join("not/yet/created"),
        ] {
            let err = ensure_separate_directories(&source, &staging).unwrap_err();
            assert!(err.to_string().contains("overlaps"), "{staging:?}: {err:#}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_separate_directories_rejects_symlink_alias() {
        let root = tempdir().unwrap();
        let source = root.path().join("card");
        fs::create_dir(&source).unwrap();
        let alias = root.path().join("alias");
        std::os::unix::fs::symlink(&source, &alias).unwrap();

        assert!(ensure_separate_directories(&source, &alias).is_err());
        assert!(ensure_separate_directories(&alias, &source).is_err());
    }

    #[test]
    fn test_list_video_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "DJI_0001_002.MP4", b"b");
        touch(dir.path(), "DJI_0001_001.mp4", b"a");
        touch(dir.path(), "DJI_0001.SRT", b"s");
        touch(dir.path(), ".DJI_0001_003.MP4", b"hidden");
        fs::create_dir(dir.path().join("SUB.MP4")).unwrap();

        let classifier = Classifier::new(&GroupingRules::default()).unwrap();
        let names = list_video_files(dir.path(), &classifier).unwrap();
        assert_eq!(names, vec!["DJI_0001_001.mp4", "DJI_0001_002.MP4"]);

        let all = list_file_names(dir.path()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_clear_directory() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.MP4", b"a");
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        touch(&dir.path().join("nested"), "b.MP4", b"b");

        assert_eq!(clear_directory(dir.path()).unwrap(), 2);
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_files_reports_progress() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        touch(src.path(), "A.MP4", b"1234");
        touch(src.path(), "B.MP4", b"123456");

        let mut seen = Vec::new();
        let stats = copy_files(
            src.path(),
            &dest.path().join("staging"),
            &["A.MP4", "B.MP4"],
            |p| seen.push((p.name.to_string(), p.files_done, p.bytes_done, p.bytes_total)),
        )
        .unwrap();

        assert_eq!(stats, CopyStats { files: 2, bytes: 10 });
        assert_eq!(
            seen,
            vec![
                ("A.MP4".to_string(), 1, 4, 10),
                ("B.MP4".to_string(), 2, 10, 10)
            ]
        );
        assert_eq!(fs::read(dest.path().join("staging/B.MP4")).unwrap(), b"123456");
        assert!(src.path().join("A.MP4").exists());
    }

    #[test]
    fn test_copy_files_fails_on_missing_source() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let err = copy_files(src.path(), dest.path(), &["gone.MP4"], |_| {}).unwrap_err();
        assert!(format!("{err:#}").contains("gone.MP4"));
    }

    #[test]
    fn test_total_size_ignores_missing() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "A.MP4", b"12345");
        assert_eq!(total_size(dir.path(), &["A.MP4", "missing.MP4"]), 5);
    }

    #[test]
    fn test_delete_files_stays_inside_dir() {
        let root = tempdir().unwrap();
        let staging = root.path().join("staging");
        fs::create_dir(&staging).unwrap();
        touch(&staging, "A.MP4", b"a");
        touch(root.path(), "outside.MP4", b"o");

        let deleted = delete_files(&staging, &["A.MP4", "missing.MP4", "../outside.MP4"]);
        assert_eq!(deleted, 1);
        assert!(!staging.join("A.MP4").exists());
        assert!(root.path().join("outside.MP4").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_available_space() {
        let dir = tempdir().unwrap();
        assert!(available_space(dir.path()).is_ok());
        assert!(check_disk_space(dir.path(), 0));
        assert!(!check_disk_space(dir.path(), u64::MAX));
    }
}
