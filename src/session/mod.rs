//! Remote session management.
//!
//! This module provides the remote shell lifecycle and the receive loop
//! that drives a command to completion.

mod remote;
mod state;

pub use remote::{
    PollPolicy, RemoteSession, DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_POLL_INTERVAL,
    DEFAULT_POLL_INTERVAL,
};
pub use state::SessionState;
