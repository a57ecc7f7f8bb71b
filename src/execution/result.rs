//! Execution result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::exit_code::MALFORMED_COMMAND_EXIT_CODE;

/// Result of running a PowerShell command remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code reported for the command.
    pub exit_code: u64,
    /// Decoded standard output.
    pub stdout: String,
    /// Decoded standard error, passed through untouched (CLIXML included).
    pub stderr: String,
    /// Stdout and stderr text in the order it was received.
    pub output: String,
    /// Time from first request to terminal status.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(
        exit_code: u64,
        stdout: String,
        stderr: String,
        output: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            output,
            duration,
        }
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if command failed.
    pub fn failed(&self) -> bool {
        !self.success()
    }

    /// Check if the remote shell could not interpret the command at all.
    pub fn is_malformed_command(&self) -> bool {
        self.exit_code == MALFORMED_COMMAND_EXIT_CODE
    }

    /// Get stdout, trimmed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stdout lines.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
