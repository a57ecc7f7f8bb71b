//! Output fragments as delivered by the remote shell.

use std::fmt;

/// Stream a fragment was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputStream {
    /// Name used by the WinRM protocol for this stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk of raw command output.
///
/// `sequence` increases along each stream. Its starting value and step
/// are up to the transport, and it may be shared between both streams.
/// Nothing orders stdout fragments relative to stderr fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFragment {
    /// Stream source.
    pub stream: OutputStream,
    /// Raw bytes.
    pub data: Vec<u8>,
    /// Position within the stream.
    pub sequence: u64,
}

impl OutputFragment {
    /// Create a new output fragment.
    pub fn new(stream: OutputStream, data: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self {
            stream,
            data: data.into(),
            sequence,
        }
    }

    /// Create a stdout fragment.
    pub fn stdout(data: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self::new(OutputStream::Stdout, data, sequence)
    }

    /// Create a stderr fragment.
    pub fn stderr(data: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self::new(OutputStream::Stderr, data, sequence)
    }
}
