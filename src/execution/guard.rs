//! Selection between inline execution and upload-and-run.

use tracing::{debug, warn};

use super::encoder::EncodedInvocation;

/// Longest command line, in bytes, the remote shell accepts in one request.
///
/// A body of 3048 single-byte characters encodes to exactly this length.
pub const DEFAULT_MAX_COMMAND_LENGTH: usize = 8155;

/// How a command reaches the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Submit the encoded command line directly.
    Inline,
    /// Write the script to a remote temp file, then run the file.
    UploadAndRun,
}

/// Measures command lines against the protocol limit.
///
/// An oversized inline command is still submitted unless `auto_upload` is
/// set; the remote shell then rejects it with a non-zero exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthGuard {
    max_command_length: usize,
    auto_upload: bool,
}

impl LengthGuard {
    /// Create a guard for the given limit.
    pub fn new(max_command_length: usize) -> Self {
        Self {
            max_command_length,
            auto_upload: false,
        }
    }

    /// Switch oversized inline commands to the upload path.
    pub fn with_auto_upload(mut self, auto_upload: bool) -> Self {
        self.auto_upload = auto_upload;
        self
    }

    /// The configured limit in bytes.
    pub fn max_command_length(&self) -> usize {
        self.max_command_length
    }

    /// Check if the invocation fits in a single command request.
    pub fn fits(&self, invocation: &EncodedInvocation) -> bool {
        invocation.len() <= self.max_command_length
    }

    /// Pick the execution strategy.
    pub fn decide(&self, invocation: &EncodedInvocation, upload_requested: bool) -> Strategy {
        if upload_requested {
            return Strategy::UploadAndRun;
        }
        if self.fits(invocation) {
            return Strategy::Inline;
        }
        if self.auto_upload {
            debug!(
                length = invocation.len(),
                limit = self.max_command_length,
                "command too long, switching to upload"
            );
            Strategy::UploadAndRun
        } else {
            warn!(
                length = invocation.len(),
                limit = self.max_command_length,
                "command exceeds the remote length limit and will likely be rejected"
            );
            Strategy::Inline
        }
    }

    /// Raw bytes per upload fragment. Base64 of a fragment stays within
    /// the limit, and fragments decode independently.
    pub fn fragment_capacity(&self) -> usize {
        ((self.max_command_length / 4) * 3).max(3)
    }
}

impl Default for LengthGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMMAND_LENGTH)
    }
}
