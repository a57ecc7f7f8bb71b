//! Command building and representation.

use serde::{Deserialize, Serialize};

/// Options that change how a script is launched remotely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Run under the 32-bit PowerShell host instead of the 64-bit one.
    pub use_32bit: bool,
}

/// A PowerShell script to run on the remote host.
///
/// The body is kept verbatim; quoting, whitespace and line endings reach
/// the remote host unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    body: String,
    options: ExecutionOptions,
}

impl Command {
    /// Create a new command with the given script body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            options: ExecutionOptions::default(),
        }
    }

    /// Select the 32-bit PowerShell host.
    pub fn use_32bit(mut self, use_32bit: bool) -> Self {
        self.options.use_32bit = use_32bit;
        self
    }

    /// Replace all execution options.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// The script body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The execution options.
    pub fn options(&self) -> ExecutionOptions {
        self.options
    }
}

impl From<&str> for Command {
    fn from(body: &str) -> Self {
        Self::new(body)
    }
}

impl From<String> for Command {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}
