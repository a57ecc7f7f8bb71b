//! Mapping of remote terminal status to exit codes.

use crate::transport::TerminalStatus;

/// Exit code for a command the remote shell could not interpret at all,
/// such as an empty `-encodedCommand` argument.
pub const MALFORMED_COMMAND_EXIT_CODE: u64 = 4_294_770_688;

/// Resolve the exit code to report for a terminal status.
pub fn resolve_exit_code(status: &TerminalStatus) -> u64 {
    match status {
        TerminalStatus::Exited(code) => *code,
        TerminalStatus::Rejected(_) => MALFORMED_COMMAND_EXIT_CODE,
    }
}
