//! Status writer for append-only status.jsonl output.
//!
//! One JSON line per completed cycle; the file survives restarts and is meant for
//! external monitoring.

use std::path::{Path, PathBuf};

use peerwatch_fs::{Filesystem, FsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::CycleReport;

/// Errors from status writing.
#[derive(Debug, Error)]
pub enum StatusWriterError {
    #[error("failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to append status: {0}")]
    Append(#[source] FsError),
}

/// A single status line written per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    /// Unix epoch seconds when the cycle completed.
    pub timestamp: i64,
    /// Cycle number (1-indexed) since process start.
    pub cycle: u64,
    pub blocks_scanned: u64,
    pub active_addresses: u64,
    pub events: u64,
    pub dispatched: u64,
    pub suppressed: u64,
    pub stale_repeats: u64,
    pub failures: u64,
}

impl StatusLine {
    pub fn from_report(timestamp: i64, cycle: u64, report: &CycleReport) -> Self {
        Self {
            timestamp,
            cycle,
            blocks_scanned: report.blocks_scanned as u64,
            active_addresses: report.active_addresses as u64,
            events: report.events as u64,
            dispatched: report.dispatched as u64,
            suppressed: report.suppressed as u64,
            stale_repeats: report.stale_repeats as u64,
            failures: report.failures as u64,
        }
    }

    /// Serialize to a JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Writer for the append-only status file.
pub struct StatusWriter<F: Filesystem> {
    fs: F,
    path: PathBuf,
}

impl<F: Filesystem> StatusWriter<F> {
    pub fn new(fs: F, path: PathBuf) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a status line, creating the file if needed.
    pub fn append(&self, status: &StatusLine) -> Result<(), StatusWriterError> {
        let line = format!("{}\n", status.to_json()?);
        self.fs
            .append_atomic(&self.path, line.as_bytes())
            .map_err(StatusWriterError::Append)
    }
}
