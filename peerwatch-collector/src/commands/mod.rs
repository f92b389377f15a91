//! Orchestration.
//!
//! - `cycle` - one scan, decide and dispatch pass
//! - `run` - the periodic scheduler around it

pub mod cycle;
pub mod run;

pub use cycle::{run_cycle, CyclePlan, CycleReport};
pub use run::{execute_run, wait_interruptible, RunResult};

use crate::announce::AnnounceError;
use crate::callback::CallbackError;
use crate::cli::CliError;
use crate::source::SourceError;
use peerwatch_fs::FsError;
use peerwatch_ranges::RangeLoadError;
use thiserror::Error;

/// Errors that stop the process. Nothing inside a cycle produces one.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("range configuration error: {0}")]
    Ranges(#[from] RangeLoadError),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    #[error("source client error: {0}")]
    Source(#[from] SourceError),

    #[error("announce client error: {0}")]
    Announce(#[from] AnnounceError),

    #[error("callback client error: {0}")]
    Callback(#[from] CallbackError),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
