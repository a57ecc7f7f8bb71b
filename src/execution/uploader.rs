//! Upload-and-run for scripts too long for a single command line.
//!
//! The script is written to a file in the remote `%TEMP%` directory by a
//! small writer command that appends base64 lines read from stdin. A
//! second shell runs the file, a third deletes it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};
use uuid::Uuid;

use super::command::{Command, ExecutionOptions};
use super::encoder::CommandEncoder;
use super::executor::run_once;
use super::result::ExecutionResult;
use crate::output::{OutputCallback, OutputMultiplexer};
use crate::session::PollPolicy;
use crate::transport::Transport;
use crate::Result;

/// Default prefix for remote temporary script names.
pub const DEFAULT_TEMP_FILE_PREFIX: &str = "winrm-ps-";

/// Windows PowerShell reads BOM-less scripts in the ANSI code page.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A script file in the remote user's temp directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTempFile {
    file_name: String,
}

impl RemoteTempFile {
    /// Refer to an existing file name.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Pick a fresh, unique file name.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are dropped from the prefix so
    /// the name can be embedded in both cmd and PowerShell quoting.
    pub fn generate(prefix: &str) -> Self {
        let prefix: String = prefix
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        Self::new(format!("{prefix}{}.ps1", Uuid::new_v4().simple()))
    }

    /// Bare file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path as understood by cmd.exe.
    pub fn cmd_path(&self) -> String {
        format!(r"%TEMP%\{}", self.file_name)
    }

    /// Path expression as understood by PowerShell.
    pub fn powershell_path(&self) -> String {
        format!("(Join-Path $env:TEMP '{}')", self.file_name)
    }

    /// PowerShell that appends decoded stdin lines to this file.
    pub fn writer_script(&self) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'\n\
             $stream = [System.IO.File]::Open({path}, [System.IO.FileMode]::Append, [System.IO.FileAccess]::Write)\n\
             try {{\n\
             \x20   while ($null -ne ($line = [Console]::In.ReadLine())) {{\n\
             \x20       if ($line.Length -gt 0) {{\n\
             \x20           $bytes = [System.Convert]::FromBase64String($line)\n\
             \x20           $stream.Write($bytes, 0, $bytes.Length)\n\
             \x20       }}\n\
             \x20   }}\n\
             }} finally {{\n\
             \x20   $stream.Dispose()\n\
             }}\n",
            path = self.powershell_path()
        )
    }

    /// Longest command line the upload path sends for this file.
    ///
    /// A length limit below this makes every upload fail remotely.
    pub fn required_command_length(&self) -> usize {
        let options = ExecutionOptions::default();
        let writer = CommandEncoder::encode_script(&self.writer_script(), options);
        let cleanup = CommandEncoder::encode_script(&self.cleanup_script(), options);
        let run = CommandEncoder::encode_file(self, ExecutionOptions { use_32bit: true });
        writer.len().max(cleanup.len()).max(run.len())
    }

    /// PowerShell that deletes this file; succeeds if it is already gone.
    pub fn cleanup_script(&self) -> String {
        format!(
            "Remove-Item -LiteralPath {} -Force -ErrorAction SilentlyContinue",
            self.powershell_path()
        )
    }
}

/// Runs scripts through a remote temp file.
pub struct ScriptUploader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    policy: &'a PollPolicy,
    fragment_bytes: usize,
    temp_file_prefix: &'a str,
}

impl<'a, T: Transport + ?Sized> ScriptUploader<'a, T> {
    /// Create an uploader. Each fragment carries at most `fragment_bytes`
    /// raw bytes, rounded down to a multiple of three.
    pub fn new(
        transport: &'a T,
        policy: &'a PollPolicy,
        fragment_bytes: usize,
        temp_file_prefix: &'a str,
    ) -> Self {
        Self {
            transport,
            policy,
            fragment_bytes: (fragment_bytes / 3 * 3).max(3),
            temp_file_prefix,
        }
    }

    /// Upload `command`'s body, run it, then delete the file.
    ///
    /// The temp file is removed on every path. Removal problems are logged
    /// and never replace the execution outcome.
    pub async fn run<'c>(
        &self,
        command: &Command,
        on_output: Option<&'c mut OutputCallback<'c>>,
    ) -> Result<ExecutionResult> {
        let file = RemoteTempFile::generate(self.temp_file_prefix);
        debug!(
            file = file.file_name(),
            bytes = command.body().len(),
            "running script through remote temp file"
        );

        let outcome = self.upload_and_execute(&file, command, on_output).await;
        self.remove(&file).await;
        outcome
    }

    async fn upload_and_execute<'c>(
        &self,
        file: &RemoteTempFile,
        command: &Command,
        on_output: Option<&'c mut OutputCallback<'c>>,
    ) -> Result<ExecutionResult> {
        let written = self.upload(file, command.body()).await?;
        if written.failed() {
            warn!(
                file = file.file_name(),
                exit_code = written.exit_code,
                "script upload failed"
            );
            return Ok(written);
        }

        let invocation = CommandEncoder::encode_file(file, command.options());
        let mux = OutputMultiplexer::with_optional_callback(on_output);
        run_once(self.transport, self.policy, &invocation, &[], mux).await
    }

    /// Write `script` to `file`, one acknowledged fragment at a time.
    pub async fn upload(&self, file: &RemoteTempFile, script: &str) -> Result<ExecutionResult> {
        let fragments = self.fragments(script);
        debug!(
            file = file.file_name(),
            fragments = fragments.len(),
            "uploading script"
        );
        let writer =
            CommandEncoder::encode_script(&file.writer_script(), ExecutionOptions::default());
        run_once(
            self.transport,
            self.policy,
            &writer,
            &fragments,
            OutputMultiplexer::new(),
        )
        .await
    }

    async fn remove(&self, file: &RemoteTempFile) {
        let invocation =
            CommandEncoder::encode_script(&file.cleanup_script(), ExecutionOptions::default());
        match run_once(
            self.transport,
            self.policy,
            &invocation,
            &[],
            OutputMultiplexer::new(),
        )
        .await
        {
            Ok(result) if result.success() => {
                debug!(file = file.file_name(), "remote temp file removed");
            }
            Ok(result) => warn!(
                file = file.file_name(),
                exit_code = result.exit_code,
                stderr = %result.stderr,
                "failed to remove remote temp file"
            ),
            Err(e) => warn!(
                file = file.file_name(),
                error = %e,
                "failed to remove remote temp file"
            ),
        }
    }

    /// Split the script into stdin lines: base64 of consecutive byte
    /// ranges of the BOM-prefixed UTF-8 script.
    pub fn fragments(&self, script: &str) -> Vec<Vec<u8>> {
        let mut bytes = Vec::with_capacity(UTF8_BOM.len() + script.len());
        bytes.extend_from_slice(UTF8_BOM);
        bytes.extend_from_slice(script.as_bytes());

        bytes
            .chunks(self.fragment_bytes)
            .map(|chunk| {
                let mut line = BASE64.encode(chunk).into_bytes();
                line.extend_from_slice(b"\r\n");
                line
            })
            .collect()
    }
}
