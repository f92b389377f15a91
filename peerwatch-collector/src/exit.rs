//! Exit codes for the peerwatch binary.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error.
    pub const IO_ERROR: i32 = 2;
    /// Range table or blocks file could not be loaded.
    pub const RANGES_ERROR: i32 = 3;
    /// An HTTP client could not be constructed.
    pub const CLIENT_ERROR: i32 = 4;
    /// Interrupted by signal (128 + signal number).
    pub const SIGINT: i32 = 130;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Filesystem(_) => codes::IO_ERROR,
        CommandError::Ranges(_) => codes::RANGES_ERROR,
        CommandError::Source(_) | CommandError::Announce(_) | CommandError::Callback(_) => {
            codes::CLIENT_ERROR
        }
    }
}
