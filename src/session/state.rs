//! Remote session state machine.

/// Represents the lifecycle state of a remote shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Shell has been created, no command submitted yet.
    #[default]
    Created,
    /// The session's single command has been submitted.
    Running,
    /// A transport error interrupted the session. The shell still has
    /// to be closed.
    Failed,
    /// Shell has been released and cannot be reused.
    Closed,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Running
    /// - Created -> Failed
    /// - Running -> Failed
    /// - Created | Running | Failed -> Closed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Created, Running)
                | (Created, Failed)
                | (Running, Failed)
                | (Created, Closed)
                | (Running, Closed)
                | (Failed, Closed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::Error::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Check if the session can accept its command.
    pub fn can_run(&self) -> bool {
        matches!(self, SessionState::Created)
    }
}
