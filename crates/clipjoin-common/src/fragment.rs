//! Fragment classification.
//!
//! Cameras that split long recordings at a size limit write the pieces with a
//! shared name prefix and an incrementing suffix (`DJI_0001_001.MP4`,
//! `DJI_0001_002.MP4`, ...), while recordings that never hit the limit keep a
//! plain name (`DJI_0030.MP4`). The [`Classifier`] turns a flat listing into
//! ordered [`FragmentGroup`]s:
//!
//! 1. names without the container extension are ignored
//! 2. names matching the completed-recording pattern are excluded
//! 3. the rest are grouped by their first `key_length` characters
//! 4. members are ordered byte-wise, groups by key
//!
//! Ordering is purely lexicographic. That matches recording order as long as
//! the firmware numbers fragments with fixed-width, zero-padded counters;
//! [`FragmentGroup::sequence_issues`] reports groups where that assumption
//! looks shaky without changing the order.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::paths::has_extension;
use crate::{Error, Result};

/// Default number of leading characters that identify a recording.
pub const DEFAULT_KEY_LENGTH: usize = 8;

/// Default container extension (matched case-insensitively).
pub const DEFAULT_EXTENSION: &str = "MP4";

/// Default prefix of recordings that were never split.
pub const DEFAULT_COMPLETED_PREFIX: &str = "DJI_";

/// Default width of the numeric segment of unsplit recordings.
pub const DEFAULT_COMPLETED_DIGITS: usize = 4;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Naming rules that drive classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingRules {
    /// Number of leading characters forming the group key.
    pub key_length: usize,
    /// Container extension, without the dot.
    pub extension: String,
    /// Literal prefix of already-complete recordings.
    pub completed_prefix: String,
    /// Exact digit count following `completed_prefix`.
    pub completed_digits: usize,
}

impl Default for GroupingRules {
    fn default() -> Self {
        Self {
            key_length: DEFAULT_KEY_LENGTH,
            extension: DEFAULT_EXTENSION.to_string(),
            completed_prefix: DEFAULT_COMPLETED_PREFIX.to_string(),
            completed_digits: DEFAULT_COMPLETED_DIGITS,
        }
    }
}

impl GroupingRules {
    /// Check that the rules describe a usable classifier.
    pub fn validate(&self) -> Result<()> {
        if self.key_length == 0 {
            return Err(Error::rule("key_length must be at least 1"));
        }
        if self.extension.is_empty() {
            return Err(Error::rule("extension cannot be empty"));
        }
        if self.extension.contains(['.', '/', '\\']) {
            return Err(Error::rule(format!(
                "extension '{}' must be given without dots or separators",
                self.extension
            )));
        }
        if self.completed_digits == 0 {
            return Err(Error::rule("completed_digits must be at least 1"));
        }
        Ok(())
    }

    /// Regular expression matching already-complete recordings.
    ///
    /// ASCII digits only (`[0-9]`, not `\d`), extension case-insensitive.
    pub fn completed_pattern(&self) -> String {
        format!(
            r"^{}[0-9]{{{}}}\.(?i:{})$",
            regex::escape(&self.completed_prefix),
            self.completed_digits,
            regex::escape(&self.extension)
        )
    }
}

// ---------------------------------------------------------------------------
// Names and keys
// ---------------------------------------------------------------------------

/// Prefix shared by all fragments of one original recording.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Wrap a key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GroupKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A fragment file name (no directory component).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentName(String);

impl FragmentName {
    /// The file name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part of the name after the group key (e.g. `_002.MP4`).
    pub fn sequence_indicator(&self, key: &GroupKey) -> &str {
        self.0.strip_prefix(key.as_str()).unwrap_or(&self.0)
    }
}

impl fmt::Display for FragmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FragmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Fragments of one recording, in join order.
///
/// Always holds at least one member; members are unique and sorted byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentGroup {
    key: GroupKey,
    members: Vec<FragmentName>,
}

impl FragmentGroup {
    pub(crate) fn new(key: GroupKey, members: Vec<FragmentName>) -> Self {
        debug_assert!(!members.is_empty());
        Self { key, members }
    }

    /// The group key.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Members in join order.
    pub fn members(&self) -> &[FragmentName] {
        &self.members
    }

    /// Member names in join order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(FragmentName::as_str).collect()
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the recording consists of a single fragment.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    /// Member paths inside `dir`, in join order.
    pub fn paths_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.members.iter().map(|m| dir.join(m.as_str())).collect()
    }

    /// Inspect the trailing counters of the members.
    ///
    /// Lexicographic order only equals recording order for fixed-width,
    /// zero-padded numbering. This reports names without a counter, mixed
    /// counter widths, counters that do not increase in join order and gaps
    /// that suggest a missing fragment. An empty result means the numbering
    /// is consistent.
    pub fn sequence_issues(&self) -> Vec<SequenceIssue> {
        let mut issues = Vec::new();
        let mut counters: Vec<(&FragmentName, &str, u64)> = Vec::new();

        for member in &self.members {
            let indicator = member.sequence_indicator(&self.key);
            let stem = indicator.rsplit_once('.').map_or(indicator, |(s, _)| s);
            let digits_start = stem
                .char_indices()
                .rev()
                .take_while(|(_, c)| c.is_ascii_digit())
                .last()
                .map(|(i, _)| i);

            let parsed = digits_start.and_then(|start| {
                let digits = &stem[start..];
                digits.parse::<u64>().ok().map(|n| (digits, n))
            });

            match parsed {
                Some((digits, value)) => counters.push((member, digits, value)),
                None => issues.push(SequenceIssue::MissingNumber {
                    name: member.as_str().to_string(),
                }),
            }
        }

        let widths: BTreeSet<usize> = counters.iter().map(|(_, d, _)| d.len()).collect();
        if widths.len() > 1 {
            issues.push(SequenceIssue::MixedWidth {
                widths: widths.into_iter().collect(),
            });
        }

        for pair in counters.windows(2) {
            let (prev_name, _, prev) = pair[0];
            let (next_name, _, next) = pair[1];
            if next <= prev {
                issues.push(SequenceIssue::NotIncreasing {
                    previous: prev_name.as_str().to_string(),
                    next: next_name.as_str().to_string(),
                });
            } else if next - prev > 1 {
                issues.push(SequenceIssue::Gap {
                    previous: prev_name.as_str().to_string(),
                    next: next_name.as_str().to_string(),
                    missing: next - prev - 1,
                });
            }
        }

        issues
    }
}

/// A numbering irregularity found by [`FragmentGroup::sequence_issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceIssue {
    /// The name has no trailing counter after the group key.
    MissingNumber { name: String },
    /// Counters of different widths: lexicographic order may be wrong.
    MixedWidth { widths: Vec<usize> },
    /// A counter does not exceed its predecessor in join order.
    NotIncreasing { previous: String, next: String },
    /// Counters skip values: a fragment may be missing.
    Gap {
        previous: String,
        next: String,
        missing: u64,
    },
}

impl fmt::Display for SequenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNumber { name } => write!(f, "{name} has no fragment counter"),
            Self::MixedWidth { widths } => {
                write!(f, "fragment counters have mixed widths {widths:?}")
            }
            Self::NotIncreasing { previous, next } => {
                write!(f, "{next} does not follow {previous} numerically")
            }
            Self::Gap {
                previous,
                next,
                missing,
            } => write!(f, "{missing} fragment(s) missing between {previous} and {next}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Full result of classifying a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Groups ordered by key.
    pub groups: Vec<FragmentGroup>,
    /// Recordings excluded because they are already whole, sorted.
    pub completed: Vec<String>,
    /// Names without the container extension, sorted.
    pub ignored: Vec<String>,
}

impl Classification {
    /// Total number of fragments across all groups.
    pub fn fragment_count(&self) -> usize {
        self.groups.iter().map(FragmentGroup::len).sum()
    }

    /// Look up a group by key.
    pub fn group(&self, key: &str) -> Option<&FragmentGroup> {
        self.groups.iter().find(|g| g.key.as_str() == key)
    }
}

/// Compiled grouping rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: GroupingRules,
    completed: Regex,
}

impl Classifier {
    /// Compile a classifier from rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rule`] when the rules are invalid.
    pub fn new(rules: &GroupingRules) -> Result<Self> {
        rules.validate()?;
        let completed = Regex::new(&rules.completed_pattern())?;
        Ok(Self {
            rules: rules.clone(),
            completed,
        })
    }

    /// The rules this classifier was built from.
    pub fn rules(&self) -> &GroupingRules {
        &self.rules
    }

    /// Container extension in use.
    pub fn extension(&self) -> &str {
        &self.rules.extension
    }

    /// Whether a name carries the container extension.
    pub fn is_video(&self, name: &str) -> bool {
        has_extension(name, &self.rules.extension)
    }

    /// Whether a name is an already-complete, unsplit recording.
    pub fn is_completed_recording(&self, name: &str) -> bool {
        self.completed.is_match(name)
    }

    /// First `key_length` characters of a name (the whole name if shorter).
    pub fn group_key(&self, name: &str) -> GroupKey {
        let end = name
            .char_indices()
            .nth(self.rules.key_length)
            .map_or(name.len(), |(i, _)| i);
        GroupKey::new(&name[..end])
    }

    /// Partition names into ordered fragment groups.
    pub fn classify<I, S>(&self, names: I) -> Vec<FragmentGroup>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.partition(names).groups
    }

    /// Partition names, keeping the excluded and ignored names as well.
    pub fn partition<I, S>(&self, names: I) -> Classification
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect();

        let mut result = Classification::default();
        let mut grouped: BTreeMap<GroupKey, Vec<FragmentName>> = BTreeMap::new();

        // BTreeSet yields names in byte-wise order, so members arrive sorted.
        for name in unique {
            if !self.is_video(&name) {
                result.ignored.push(name);
            } else if self.is_completed_recording(&name) {
                result.completed.push(name);
            } else {
                grouped
                    .entry(self.group_key(&name))
                    .or_default()
                    .push(FragmentName(name));
            }
        }

        result.groups = grouped
            .into_iter()
            .map(|(key, members)| FragmentGroup::new(key, members))
            .collect();
        result
    }
}
