//! Clipjoin-Common: fragment naming, grouping and shared utilities.
//!
//! This crate holds the pure parts of clipjoin:
//!
//! - **Fragments**: recognising camera fragment files, excluding recordings
//!   that are already whole, and grouping the rest into ordered join groups
//! - **Path Utilities**: extension checks and destination-name sanitizing
//! - **Formatting**: human-readable byte sizes and durations
//! - **Error Handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use clipjoin_common::{Classifier, GroupingRules};
//!
//! let classifier = Classifier::new(&GroupingRules::default())?;
//! let groups = classifier.classify(["DJI_0001_002.MP4", "DJI_0001_001.MP4", "DJI_0030.MP4"]);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].key().as_str(), "DJI_0001");
//! assert_eq!(groups[0].names(), vec!["DJI_0001_001.MP4", "DJI_0001_002.MP4"]);
//! # Ok::<(), clipjoin_common::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod fragment;
pub mod paths;

pub use error::{Error, Result};
pub use fragment::{
    Classification, Classifier, FragmentGroup, FragmentName, GroupKey, GroupingRules,
    SequenceIssue,
};
