//! WinRM transport seam.
//!
//! The engine never builds SOAP envelopes or talks HTTP itself. Everything
//! it needs from the remote host goes through the [`Transport`] trait, one
//! request/response round trip per method call.

mod id;

pub use id::{CommandId, ShellId};

use async_trait::async_trait;
use thiserror::Error;

use crate::output::OutputFragment;

/// Terminal status of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    /// The command ran and reported this exit code.
    Exited(u64),
    /// The remote shell refused to interpret the command.
    Rejected(String),
}

/// Reply to a single receive request.
#[derive(Debug, Clone, Default)]
pub struct ReceiveResponse {
    /// Output produced since the previous receive, in arrival order.
    pub fragments: Vec<OutputFragment>,
    /// Set once the command has finished.
    pub status: Option<TerminalStatus>,
}

impl ReceiveResponse {
    /// A response carrying output but no terminal status.
    pub fn output(fragments: Vec<OutputFragment>) -> Self {
        Self {
            fragments,
            status: None,
        }
    }

    /// A response that ends the command.
    pub fn done(fragments: Vec<OutputFragment>, exit_code: u64) -> Self {
        Self {
            fragments,
            status: Some(TerminalStatus::Exited(exit_code)),
        }
    }

    /// A response with nothing new.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Check if the response has neither output nor status.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.status.is_none()
    }
}

/// Errors reported by a transport implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection to the remote host failed or was severed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The remote host returned a fault for the request.
    #[error("remote host rejected the request: {0}")]
    Rejected(String),

    /// The remote host answered with something that could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Faults are command-level outcomes; everything else is fatal.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TransportError::Rejected(_))
    }
}

/// Operations the engine consumes from a WinRM client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a remote shell.
    async fn create_shell(&self) -> Result<ShellId, TransportError>;

    /// Start a command line inside a shell.
    async fn send_command(
        &self,
        shell: &ShellId,
        command_line: &str,
    ) -> Result<CommandId, TransportError>;

    /// Fetch output produced since the last receive.
    async fn receive(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<ReceiveResponse, TransportError>;

    /// Write to the command's standard input. Returns once the remote
    /// host acknowledged the data.
    async fn send_input(
        &self,
        shell: &ShellId,
        command: &CommandId,
        data: &[u8],
        end_of_input: bool,
    ) -> Result<(), TransportError>;

    /// Send the terminate signal to a command.
    async fn signal_terminate(
        &self,
        shell: &ShellId,
        command: &CommandId,
    ) -> Result<(), TransportError>;

    /// Delete a remote shell.
    async fn delete_shell(&self, shell: &ShellId) -> Result<(), TransportError>;
}
