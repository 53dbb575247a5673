//! Batch and join integration tests.
//!
//! Runs the real join executor against fake ffmpeg scripts so success, tool
//! failure and empty output can be exercised without media files.

#![cfg(unix)]

mod common;

use assert_matches::assert_matches;
use clipjoin::batch::BatchRunner;
use clipjoin::join::{FfmpegJoiner, JoinFailure, JoinOutcome, Joiner};
use clipjoin_av::ToolPaths;
use clipjoin_common::{Classifier, GroupingRules};
use common::*;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn joiner(ffmpeg: &Path) -> FfmpegJoiner {
    FfmpegJoiner::new("MP4").with_tools(ToolPaths {
        ffmpeg: Some(ffmpeg.to_path_buf()),
        ffprobe: None,
    })
}

fn classifier() -> Classifier {
    Classifier::new(&GroupingRules::default()).unwrap()
}

#[test]
fn test_single_fragment_group_is_copied_through() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    make_footage(&source, &["DJI_0099_001.MP4"]);
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_CONCAT);

    let classifier = classifier();
    let joiner = joiner(&ffmpeg);
    let report = BatchRunner::new(&classifier, &joiner).run(
        ["DJI_0099_001.MP4"],
        &source,
        &output,
    );

    assert!(report.is_success());
    let joined = report.outcome("DJI_0099").unwrap().joined().unwrap();
    assert_eq!(joined.path, output.join("DJI_0099.MP4"));
    assert_eq!(joined.inputs, 1);
    assert_eq!(
        fs::read(&joined.path).unwrap(),
        fs::read(source.join("DJI_0099_001.MP4")).unwrap()
    );
    assert_eq!(list_dir(&output), vec!["DJI_0099.MP4"]);
}

#[test]
fn test_fragments_joined_in_name_order() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    let names = ["DJI_0001_002.MP4", "DJI_0001_001.MP4", "DJI_0001_003.MP4"];
    make_footage(&source, &names);
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_CONCAT);

    let classifier = classifier();
    let joiner = joiner(&ffmpeg);
    let report = BatchRunner::new(&classifier, &joiner).run(names, &source, &output);

    let joined = report.outcome("DJI_0001").unwrap().joined().unwrap();
    assert_eq!(
        fs::read_to_string(&joined.path).unwrap(),
        "DJI_0001_001.MP4DJI_0001_002.MP4DJI_0001_003.MP4"
    );
    assert_eq!(joined.size, 48);
    for name in names {
        assert!(source.join(name).exists(), "source {name} must be kept");
    }
}

#[test]
fn test_tool_failure_recorded_and_batch_continues() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    let names = [
        "DJI_0001_001.MP4",
        "DJI_0001_002.MP4",
        "DJI_0002_001_BROKEN.MP4",
        "DJI_0003_001.MP4",
    ];
    make_footage(&source, &names);
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_SELECTIVE);

    let classifier = classifier();
    let joiner = joiner(&ffmpeg);
    let report = BatchRunner::new(&classifier, &joiner).run(names, &source, &output);

    assert_eq!(report.len(), 3);
    assert!(!report.is_success());
    assert!(report.outcome("DJI_0001").unwrap().is_success());
    assert!(report.outcome("DJI_0003").unwrap().is_success());
    assert_matches!(
        report.outcome("DJI_0002").unwrap(),
        JoinOutcome::Failure(JoinFailure::ToolExit { diagnostics, .. })
            if diagnostics.contains("Invalid data found")
    );
    assert_eq!(list_dir(&output), vec!["DJI_0001.MP4", "DJI_0003.MP4"]);
}

#[test]
fn test_empty_output_is_integrity_failure() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    make_footage(&source, &["DJI_0001_001.MP4", "DJI_0001_002.MP4"]);
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_EMPTY);

    let outcome = joiner(&ffmpeg).join(
        &[source.join("DJI_0001_001.MP4"), source.join("DJI_0001_002.MP4")],
        "DJI_0001",
        &output,
    );

    assert_matches!(
        outcome,
        JoinOutcome::Failure(JoinFailure::OutputIntegrity { ref path, .. })
            if path == &output.join("DJI_0001.MP4")
    );
    assert!(list_dir(&output).is_empty());
}

#[test]
fn test_failed_join_keeps_previous_output() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    make_footage(&source, &["DJI_0001_001.MP4"]);
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("DJI_0001.MP4"), b"earlier run").unwrap();
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_FAIL);

    let outcome = joiner(&ffmpeg).join(&[source.join("DJI_0001_001.MP4")], "DJI_0001", &output);

    assert_matches!(outcome, JoinOutcome::Failure(JoinFailure::ToolExit { .. }));
    assert_eq!(fs::read(output.join("DJI_0001.MP4")).unwrap(), b"earlier run");
}

#[test]
fn test_rejoin_is_idempotent() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    let names = ["DJI_0001_001.MP4", "DJI_0001_002.MP4"];
    make_footage(&source, &names);
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_CONCAT);

    let classifier = classifier();
    let joiner = joiner(&ffmpeg);
    let runner = BatchRunner::new(&classifier, &joiner);

    let first = runner.run(names, &source, &output);
    let first_bytes = fs::read(output.join("DJI_0001.MP4")).unwrap();
    let second = runner.run(names, &source, &output);
    let second_bytes = fs::read(output.join("DJI_0001.MP4")).unwrap();

    assert_eq!(
        first.outcome("DJI_0001").unwrap().joined().unwrap().size,
        second.outcome("DJI_0001").unwrap().joined().unwrap().size
    );
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(list_dir(&output), vec!["DJI_0001.MP4"]);
}

#[test]
fn test_hung_tool_times_out() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    make_footage(&source, &["DJI_0001_001.MP4"]);
    let ffmpeg = fake_ffmpeg(root.path(), "#!/bin/sh\nexec sleep 30\n");

    let outcome = joiner(&ffmpeg)
        .with_timeout(Some(Duration::from_millis(200)))
        .join(&[source.join("DJI_0001_001.MP4")], "DJI_0001", &output);

    assert_matches!(outcome, JoinOutcome::Failure(JoinFailure::TimedOut { .. }));
    assert!(list_dir(&output).is_empty());
}

#[test]
fn test_hung_wrapper_script_times_out_promptly() {
    let root = tempdir().unwrap();
    let source = root.path().join("source");
    let output = root.path().join("processed");
    make_footage(&source, &["DJI_0001_001.MP4"]);
    // No exec: the sleeping grandchild keeps stdout and stderr open.
    let ffmpeg = fake_ffmpeg(root.path(), "#!/bin/sh\nsleep 6\n");

    let started = Instant::now();
    let outcome = joiner(&ffmpeg)
        .with_timeout(Some(Duration::from_millis(200)))
        .join(&[source.join("DJI_0001_001.MP4")], "DJI_0001", &output);

    assert_matches!(outcome, JoinOutcome::Failure(JoinFailure::TimedOut { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "took {:?}",
        started.elapsed()
    );
    assert!(list_dir(&output).is_empty());
}

#[test]
fn test_missing_fragment_is_filesystem_failure() {
    let root = tempdir().unwrap();
    let output = root.path().join("processed");
    let ffmpeg = fake_ffmpeg(root.path(), FAKE_FFMPEG_CONCAT);

    let outcome = joiner(&ffmpeg).join(
        &[root.path().join("source/DJI_0001_001.MP4")],
        "DJI_0001",
        &output,
    );

    assert_matches!(outcome, JoinOutcome::Failure(JoinFailure::Filesystem(_)));
}
