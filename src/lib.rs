//! # winrm-ps
//!
//! PowerShell execution over WinRM remote shells.
//!
//! This crate decides how a script reaches the remote host, drives the
//! remote command to completion and merges its output. The WinRM wire
//! protocol itself is supplied by the caller through the [`Transport`]
//! trait.
//!
//! ## Features
//!
//! - **Encoded commands**: scripts travel as `-encodedCommand`, so quoting,
//!   line breaks and non-ASCII text reach PowerShell untouched
//! - **Upload-and-run**: scripts longer than the command line limit are
//!   written to a remote temp file in fragments and run from there
//! - **Streaming output**: stdout and stderr are handed to a callback as
//!   they arrive, and collected into one result
//! - **32-bit host**: optional selection of the SysWOW64 PowerShell
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use winrm_ps::{Command, Config, PowerShellExecutor, Transport};
//!
//! async fn run(transport: Arc<dyn Transport>) -> winrm_ps::Result<()> {
//!     // Initialize logging
//!     winrm_ps::logging::try_init().ok();
//!
//!     let config = Config::load(None)?;
//!     let executor = PowerShellExecutor::with_config(transport, &config);
//!
//!     let result = executor.execute_inline(&Command::new("ipconfig"), None).await?;
//!     println!("{}", result.stdout);
//!
//!     let long_script = format!("Write-Host '{}'", "x".repeat(10_000));
//!     let result = executor.execute_via_upload(&long_script, None).await?;
//!     assert_eq!(result.exit_code, 0);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use execution::{
    Command, CommandEncoder, EncodedInvocation, ExecutionOptions, ExecutionResult, LengthGuard,
    PowerShellExecutor, ScriptUploader, Strategy, MALFORMED_COMMAND_EXIT_CODE,
};
pub use output::{OutputCallback, OutputFragment, OutputMultiplexer, OutputStream};
pub use session::{PollPolicy, RemoteSession, SessionState};
pub use transport::{
    CommandId, ReceiveResponse, ShellId, TerminalStatus, Transport, TransportError,
};
