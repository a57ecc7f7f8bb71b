//! Command execution engine.
//!
//! This module provides:
//! - Encoding of scripts into `-encodedCommand` invocations
//! - The length check that picks inline or upload-and-run
//! - Upload of oversized scripts through a remote temp file
//! - Exit code resolution and aggregated results
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use winrm_ps::{Command, OutputStream, PowerShellExecutor, Transport};
//!
//! async fn show_ip(transport: Arc<dyn Transport>) -> winrm_ps::Result<()> {
//!     let executor = PowerShellExecutor::new(transport);
//!
//!     let mut print = |stream: OutputStream, text: &str| print!("[{stream}] {text}");
//!     let result = executor
//!         .execute_inline(&Command::new("ipconfig"), Some(&mut print))
//!         .await?;
//!     println!("exit code {}", result.exit_code);
//!     Ok(())
//! }
//! ```

mod command;
mod encoder;
mod executor;
mod exit_code;
mod guard;
mod result;
mod uploader;

pub use command::{Command, ExecutionOptions};
pub use encoder::{CommandEncoder, EncodedInvocation, POWERSHELL_32BIT, POWERSHELL_64BIT};
pub use executor::PowerShellExecutor;
pub use exit_code::{resolve_exit_code, MALFORMED_COMMAND_EXIT_CODE};
pub use guard::{LengthGuard, Strategy, DEFAULT_MAX_COMMAND_LENGTH};
pub use result::ExecutionResult;
pub use uploader::{RemoteTempFile, ScriptUploader, DEFAULT_TEMP_FILE_PREFIX};
