//! Path utilities for extension checks and output-name sanitizing.
//!
//! Extension comparisons ignore ASCII case.

use std::path::Path;

use crate::{Error, Result};

/// Characters that may never appear in a destination file name.
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', '\0'];

/// Check if a file name ends with `.<extension>`, ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use clipjoin_common::paths::has_extension;
///
/// assert!(has_extension("DJI_0001_001.MP4", "mp4"));
/// assert!(has_extension("clip.mp4", "MP4"));
/// assert!(!has_extension("clip.mp4.part", "mp4"));
/// assert!(!has_extension("MP4", "mp4"));
/// ```
pub fn has_extension(name: &str, extension: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && ext.eq_ignore_ascii_case(extension)
}

/// Check if a path's final component ends with `.<extension>`, ignoring case.
pub fn path_has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| has_extension(name, extension))
        .unwrap_or(false)
}

/// Remove a trailing `.<extension>` (any case) from a name, if present.
///
/// # Examples
///
/// ```
/// use clipjoin_common::paths::strip_extension;
///
/// assert_eq!(strip_extension("holiday.mp4", "MP4"), "holiday");
/// assert_eq!(strip_extension("holiday", "MP4"), "holiday");
/// ```
pub fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    if has_extension(name, extension) {
        &name[..name.len() - extension.len() - 1]
    } else {
        name
    }
}

/// Turn an arbitrary string into a safe single-component file name.
///
/// Path separators and NUL are replaced with `_`, control characters are
/// dropped and surrounding whitespace is trimmed. Names that end up empty or
/// consist only of dots are rejected.
///
/// # Examples
///
/// ```
/// use clipjoin_common::paths::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("DJI_0001").unwrap(), "DJI_0001");
/// assert_eq!(sanitize_file_name("trip/day 1").unwrap(), "trip_day 1");
/// assert!(sanitize_file_name("..").is_err());
/// ```
pub fn sanitize_file_name(name: &str) -> Result<String> {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() || *c == '\0')
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(Error::invalid_input(format!(
            "'{name}' is not usable as a file name"
        )));
    }

    Ok(cleaned.to_string())
}

/// Check whether a name is already a safe single path component.
pub fn is_plain_file_name(name: &str) -> bool {
    sanitize_file_name(name).map(|s| s == name).unwrap_or(false)
}
