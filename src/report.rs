//! Human-readable rendering of plans, outcomes and run totals.

use crate::batch::{BatchReport, GroupOutcome, PlannedJoin};
use crate::join::JoinOutcome;
use clipjoin_common::format::{format_duration, format_file_size};
use std::fmt::Write;
use std::time::Duration;

/// Totals shown at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub groups_total: usize,
    pub groups_joined: usize,
    pub files_copied: usize,
    pub fragments_joined: usize,
    /// Size of the fragments of successfully joined groups
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

impl RunStats {
    /// Collect totals from a finished batch. `files_copied` and `elapsed`
    /// are filled in by the caller.
    pub fn from_report(report: &BatchReport, input_bytes: u64) -> Self {
        Self {
            groups_total: report.len(),
            groups_joined: report.successes().count(),
            fragments_joined: report.joined_fragments(),
            input_bytes,
            output_bytes: report.output_bytes(),
            ..Default::default()
        }
    }

    /// Bytes no longer needed once the fragments are removed.
    pub fn space_saved(&self) -> u64 {
        self.input_bytes.saturating_sub(self.output_bytes)
    }

    pub fn summary(&self) -> String {
        let rows = [
            (
                "Groups processed",
                format!("{}/{}", self.groups_joined, self.groups_total),
            ),
            ("Files copied", self.files_copied.to_string()),
            ("Fragments joined", self.fragments_joined.to_string()),
            ("Total input size", format_file_size(self.input_bytes)),
            ("Total output size", format_file_size(self.output_bytes)),
            ("Disk space saved", format_file_size(self.space_saved())),
            ("Elapsed time", format_duration(self.elapsed)),
        ];

        let mut out = String::new();
        for (label, value) in rows {
            let _ = writeln!(out, "  {:<18} {}", label, value);
        }
        out
    }
}

/// Table of planned groups: key, fragment count, output name and members.
pub fn group_table(plan: &[PlannedJoin], extension: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:<12} {:>9}  {:<24} {}", "GROUP", "FRAGMENTS", "OUTPUT", "FILES");

    for planned in plan {
        let output = match &planned.destination {
            Ok(name) => format!("{}.{}", name, extension),
            Err(e) => format!("<{}>", e.kind()),
        };
        let _ = writeln!(
            out,
            "  {:<12} {:>9}  {:<24} {}",
            planned.group.key(),
            planned.group.len(),
            output,
            planned.group.names().join(", ")
        );
        for warning in &planned.warnings {
            let _ = writeln!(out, "  {:<12} warning: {}", "", warning);
        }
    }
    out
}

/// One status line for a finished group.
pub fn outcome_line(group: &GroupOutcome) -> String {
    let key = group.group.key();
    let count = group.group.len();
    match &group.outcome {
        JoinOutcome::Success(joined) => {
            let mut line = format!(
                "✓ {} ({} fragment(s)) -> {} [{}",
                key,
                count,
                joined.path.display(),
                format_file_size(joined.size)
            );
            if let Some(duration) = joined.duration {
                let _ = write!(line, ", {}", format_duration(duration));
            }
            line.push(']');
            line
        }
        JoinOutcome::Failure(failure) => {
            format!("✗ {} ({} fragment(s)): {}", key, count, failure.kind())
        }
    }
}

/// Full diagnostics of every failed group.
pub fn failure_details(report: &BatchReport) -> String {
    let mut out = String::new();
    for group in report.failures() {
        if let Some(failure) = group.outcome.failure() {
            let _ = writeln!(out, "  {}: {}", group.group.key(), failure);
        }
    }
    out
}
