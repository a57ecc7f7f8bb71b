//! One remote shell and the single command it runs.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::SessionState;
use crate::error::Error;
use crate::execution::EncodedInvocation;
use crate::output::OutputMultiplexer;
use crate::transport::{CommandId, ShellId, TerminalStatus, Transport, TransportError};
use crate::Result;

/// Default delay after an empty receive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for the receive backoff.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default limit for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Receive loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first empty receive.
    pub poll_interval: Duration,
    /// Delay cap; the delay doubles on every consecutive empty receive.
    pub max_poll_interval: Duration,
    /// Give up after this long without a terminal status.
    pub command_timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

impl PollPolicy {
    /// Delay to use after `delay` when the receive came back empty again.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_poll_interval)
    }
}

/// A remote shell that runs exactly one command.
///
/// [`close`](Self::close) must be called on every path, including after
/// [`run`](Self::run) returned an error.
pub struct RemoteSession<'t, T: Transport + ?Sized> {
    transport: &'t T,
    shell: ShellId,
    state: SessionState,
}

impl<'t, T: Transport + ?Sized> RemoteSession<'t, T> {
    /// Create a remote shell.
    pub async fn open(transport: &'t T) -> Result<Self> {
        let shell = transport.create_shell().await?;
        debug!(%shell, "remote shell created");
        Ok(Self {
            transport,
            shell,
            state: SessionState::Created,
        })
    }

    /// Identifier of the remote shell.
    pub fn shell_id(&self) -> &ShellId {
        &self.shell
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run `invocation` to completion.
    ///
    /// `input` is written to the command's stdin one chunk at a time, each
    /// acknowledged before the next is sent. Output is pushed into `mux`
    /// as it arrives. A command the remote host refuses yields
    /// [`TerminalStatus::Rejected`]; other transport failures are errors.
    pub async fn run(
        &mut self,
        invocation: &EncodedInvocation,
        input: &[Vec<u8>],
        mux: &mut OutputMultiplexer<'_>,
        policy: &PollPolicy,
    ) -> Result<TerminalStatus> {
        self.state.transition_to(SessionState::Running)?;

        let command = match self
            .transport
            .send_command(&self.shell, invocation.as_str())
            .await
        {
            Ok(command) => command,
            Err(e) => return self.absorb(e),
        };
        debug!(shell = %self.shell, %command, length = invocation.len(), "command started");

        match self.drive(&command, input, mux, policy).await {
            Ok(status) => {
                debug!(shell = %self.shell, %command, ?status, "command finished");
                self.terminate(&command).await;
                Ok(status)
            }
            Err(e) => {
                self.fail();
                self.terminate(&command).await;
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        command: &CommandId,
        input: &[Vec<u8>],
        mux: &mut OutputMultiplexer<'_>,
        policy: &PollPolicy,
    ) -> Result<TerminalStatus> {
        for (index, chunk) in input.iter().enumerate() {
            let last = index + 1 == input.len();
            if let Err(e) = self
                .transport
                .send_input(&self.shell, command, chunk, last)
                .await
            {
                return self.absorb(e);
            }
        }

        let started = Instant::now();
        let mut delay = policy.poll_interval;
        loop {
            let response = match self.transport.receive(&self.shell, command).await {
                Ok(response) => response,
                Err(e) => return self.absorb(e),
            };

            let received_output = !response.fragments.is_empty();
            for fragment in response.fragments {
                mux.push(fragment);
            }
            if let Some(status) = response.status {
                return Ok(status);
            }

            if let Some(timeout) = policy.command_timeout {
                if started.elapsed() >= timeout {
                    warn!(shell = %self.shell, %command, ?timeout, "command timed out");
                    return Err(Error::Timeout(timeout));
                }
            }

            if received_output {
                delay = policy.poll_interval;
            } else {
                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }

    /// Turn a remote fault into a terminal status; anything else fails the
    /// session.
    fn absorb(&mut self, err: TransportError) -> Result<TerminalStatus> {
        match err {
            TransportError::Rejected(reason) => {
                debug!(shell = %self.shell, %reason, "remote host rejected the command");
                Ok(TerminalStatus::Rejected(reason))
            }
            other => {
                self.fail();
                Err(other.into())
            }
        }
    }

    fn fail(&mut self) {
        if self.state.can_transition_to(SessionState::Failed) {
            self.state = SessionState::Failed;
        }
    }

    async fn terminate(&self, command: &CommandId) {
        if let Err(e) = self.transport.signal_terminate(&self.shell, command).await {
            debug!(shell = %self.shell, %command, error = %e, "terminate signal failed");
        }
    }

    /// Delete the remote shell.
    pub async fn close(mut self) -> Result<()> {
        let result = self.transport.delete_shell(&self.shell).await;
        // The shell is gone from our side regardless of the reply
        self.state.transition_to(SessionState::Closed)?;
        result?;
        debug!(shell = %self.shell, "remote shell closed");
        Ok(())
    }
}

impl<T: Transport + ?Sized> Drop for RemoteSession<'_, T> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(shell = %self.shell, state = ?self.state, "remote shell dropped without close");
        }
    }
}
