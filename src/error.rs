//! Error types for winrm-ps.
//!
//! Only failures that prevent obtaining any command result end up here.
//! A command that runs and fails remotely is reported through
//! [`ExecutionResult::exit_code`](crate::ExecutionResult) instead.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionState;
use crate::transport::TransportError;

/// Main error type for winrm-ps operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport collaborator failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid session state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: SessionState, to: SessionState },

    /// The remote command did not reach a terminal status in time.
    #[error("command did not complete within {0:?}")]
    Timeout(Duration),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for winrm-ps operations.
pub type Result<T> = std::result::Result<T, Error>;
