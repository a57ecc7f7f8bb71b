//! PowerShell execution engine.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::command::Command;
use super::encoder::{CommandEncoder, EncodedInvocation};
use super::exit_code::resolve_exit_code;
use super::guard::{LengthGuard, Strategy};
use super::result::ExecutionResult;
use super::uploader::{ScriptUploader, DEFAULT_TEMP_FILE_PREFIX};
use crate::config::Config;
use crate::output::{OutputCallback, OutputMultiplexer};
use crate::session::{PollPolicy, RemoteSession};
use crate::transport::Transport;
use crate::Result;

/// Runs PowerShell on a remote host through a [`Transport`].
///
/// Every call uses fresh remote shells; nothing is shared between calls.
pub struct PowerShellExecutor<T: Transport + ?Sized> {
    transport: Arc<T>,
    guard: LengthGuard,
    policy: PollPolicy,
    temp_file_prefix: String,
}

impl<T: Transport + ?Sized> PowerShellExecutor<T> {
    /// Create an executor with default settings.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            guard: LengthGuard::default(),
            policy: PollPolicy::default(),
            temp_file_prefix: DEFAULT_TEMP_FILE_PREFIX.to_string(),
        }
    }

    /// Create an executor using the limits and pacing from `config`.
    pub fn with_config(transport: Arc<T>, config: &Config) -> Self {
        Self {
            transport,
            guard: config.length_guard(),
            policy: config.poll_policy(),
            temp_file_prefix: config.upload.temp_file_prefix.clone(),
        }
    }

    /// Override the length guard.
    pub fn length_guard(mut self, guard: LengthGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Override the receive loop pacing.
    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The guard in use.
    pub fn guard(&self) -> &LengthGuard {
        &self.guard
    }

    /// Run `command` as a single encoded command line.
    ///
    /// A command that fails remotely, including one the remote shell cannot
    /// parse, is still `Ok`; inspect [`ExecutionResult::exit_code`]. Errors
    /// mean no result could be obtained.
    pub async fn execute_inline<'c>(
        &self,
        command: &Command,
        on_output: Option<&'c mut OutputCallback<'c>>,
    ) -> Result<ExecutionResult> {
        let invocation = CommandEncoder::encode(command);
        match self.guard.decide(&invocation, false) {
            Strategy::Inline => {
                debug!(
                    length = invocation.len(),
                    use_32bit = command.options().use_32bit,
                    "executing inline"
                );
                let mux = OutputMultiplexer::with_optional_callback(on_output);
                run_once(&*self.transport, &self.policy, &invocation, &[], mux).await
            }
            Strategy::UploadAndRun => self.uploader().run(command, on_output).await,
        }
    }

    /// Upload `script` to a remote temp file and run it with the 64-bit host.
    pub async fn execute_via_upload<'c>(
        &self,
        script: &str,
        on_output: Option<&'c mut OutputCallback<'c>>,
    ) -> Result<ExecutionResult> {
        self.execute_via_upload_with(&Command::new(script), on_output)
            .await
    }

    /// Upload `command`'s body to a remote temp file and run it, honoring
    /// the command's options.
    pub async fn execute_via_upload_with<'c>(
        &self,
        command: &Command,
        on_output: Option<&'c mut OutputCallback<'c>>,
    ) -> Result<ExecutionResult> {
        self.uploader().run(command, on_output).await
    }

    fn uploader(&self) -> ScriptUploader<'_, T> {
        ScriptUploader::new(
            &*self.transport,
            &self.policy,
            self.guard.fragment_capacity(),
            &self.temp_file_prefix,
        )
    }
}

/// Open a shell, run one command line in it, and close the shell.
///
/// The shell is closed even if the run failed. A close failure is logged
/// and does not replace the run's outcome.
pub(crate) async fn run_once<T: Transport + ?Sized>(
    transport: &T,
    policy: &PollPolicy,
    invocation: &EncodedInvocation,
    input: &[Vec<u8>],
    mut mux: OutputMultiplexer<'_>,
) -> Result<ExecutionResult> {
    let started = Instant::now();
    let mut session = RemoteSession::open(transport).await?;
    let shell = session.shell_id().clone();

    let outcome = session.run(invocation, input, &mut mux, policy).await;
    if let Err(e) = session.close().await {
        warn!(%shell, error = %e, "failed to close remote shell");
    }

    let status = outcome?;
    let exit_code = resolve_exit_code(&status);
    debug!(%shell, exit_code, fragments = mux.fragment_count(), "execution finished");
    Ok(mux.finish(exit_code, started.elapsed()))
}
