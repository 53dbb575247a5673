//! Clipjoin - reassemble split camera recordings
//!
//! This library crate exposes the core functionality for integration testing.

pub mod batch;
pub mod config;
pub mod ingest;
pub mod join;
pub mod report;
