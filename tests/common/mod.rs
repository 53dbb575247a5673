//! Shared fixtures for integration tests: footage directories and fake
//! ffmpeg executables.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Concatenates every file named in the `-i` list into the last argument,
/// the way a stream copy of byte-identical fragments would.
pub const FAKE_FFMPEG_CONCAT: &str = r#"#!/bin/sh
list=""
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then list="$arg"; fi
  prev="$arg"
  out="$arg"
done
: > "$out"
sed -n "s/^file '\(.*\)'\$/\1/p" "$list" | while IFS= read -r f; do cat "$f" >> "$out"; done
"#;

/// Fails when any listed input path contains `BROKEN`, otherwise concatenates.
pub const FAKE_FFMPEG_SELECTIVE: &str = r#"#!/bin/sh
list=""
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then list="$arg"; fi
  prev="$arg"
  out="$arg"
done
if grep -q BROKEN "$list"; then
  echo "$list: Invalid data found when processing input" >&2
  exit 1
fi
: > "$out"
sed -n "s/^file '\(.*\)'\$/\1/p" "$list" | while IFS= read -r f; do cat "$f" >> "$out"; done
"#;

/// Exits successfully after creating an empty output.
pub const FAKE_FFMPEG_EMPTY: &str = r#"#!/bin/sh
for arg in "$@"; do out="$arg"; done
: > "$out"
"#;

/// Always exits with an error.
pub const FAKE_FFMPEG_FAIL: &str =
    "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n";

/// Write an executable script named `ffmpeg` into `dir`.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join("ffmpeg");
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Create `names` inside `dir`, each containing its own name as bytes.
pub fn make_footage(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

/// Sorted names of the visible entries in `dir`.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Write a config file pointing at `ffmpeg` and return its path.
pub fn write_config(dir: &Path, ffmpeg: &Path, extra: &str) -> PathBuf {
    let path = dir.join("clipjoin.toml");
    let content = format!(
        "[tools]\nffmpeg_path = {:?}\n\n[run]\nprobe_duration = false\n\n{}",
        ffmpeg.display().to_string(),
        extra
    );
    fs::write(&path, content).unwrap();
    path
}
