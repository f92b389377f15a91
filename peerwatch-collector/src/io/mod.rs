//! File-backed inputs and outputs of the runner.
//!
//! - Range and block files (or the built-in tables)
//! - The append-only status heartbeat

pub mod ranges;
pub mod status_writer;

pub use ranges::{load_scan_plan, ScanPlan};
pub use status_writer::{StatusLine, StatusWriter, StatusWriterError};
