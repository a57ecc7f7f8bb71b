//! Translation of scripts into remote command lines.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::command::{Command, ExecutionOptions};
use super::uploader::RemoteTempFile;

/// 64-bit PowerShell host, resolved through the remote `PATH`.
pub const POWERSHELL_64BIT: &str = "powershell";

/// 32-bit PowerShell host on a 64-bit Windows installation.
pub const POWERSHELL_32BIT: &str = r"%windir%\SysWOW64\WindowsPowerShell\v1.0\powershell.exe";

const ENCODED_COMMAND_FLAG: &str = "-encodedCommand";

/// A command line ready to hand to the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInvocation(String);

impl EncodedInvocation {
    /// The command line.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes as sent on the wire.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the command line is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the command line.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds PowerShell command lines.
///
/// Script bodies travel as base64 of their UTF-16LE bytes through
/// `-encodedCommand`, so the remote shell never re-parses quotes or line
/// breaks and any Unicode text survives.
pub struct CommandEncoder;

impl CommandEncoder {
    /// Host binary for the given options.
    pub fn host(options: ExecutionOptions) -> &'static str {
        if options.use_32bit {
            POWERSHELL_32BIT
        } else {
            POWERSHELL_64BIT
        }
    }

    /// Encode a command for inline execution.
    pub fn encode(command: &Command) -> EncodedInvocation {
        Self::encode_script(command.body(), command.options())
    }

    /// Encode a raw script body for inline execution.
    ///
    /// An empty body yields an empty encoded argument, which the remote
    /// host rejects as a missing parameter.
    pub fn encode_script(script: &str, options: ExecutionOptions) -> EncodedInvocation {
        EncodedInvocation(format!(
            "{} {} {}",
            Self::host(options),
            ENCODED_COMMAND_FLAG,
            Self::encode_utf16_base64(script)
        ))
    }

    /// Command line that runs a previously uploaded script file.
    pub fn encode_file(file: &RemoteTempFile, options: ExecutionOptions) -> EncodedInvocation {
        EncodedInvocation(format!(
            "{} -NoProfile -NonInteractive -ExecutionPolicy Bypass -File \"{}\"",
            Self::host(options),
            file.cmd_path()
        ))
    }

    /// Base64 of the UTF-16LE representation of `script`.
    pub fn encode_utf16_base64(script: &str) -> String {
        let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
        BASE64.encode(bytes)
    }

    /// Recover the script from an `-encodedCommand` command line.
    ///
    /// Returns `None` if the line was not produced by [`encode_script`](Self::encode_script).
    pub fn decode_script(command_line: &str) -> Option<String> {
        let (_, encoded) = command_line.split_once(ENCODED_COMMAND_FLAG)?;
        let bytes = BASE64.decode(encoded.trim()).ok()?;
        if bytes.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    }
}
