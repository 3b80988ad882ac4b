//! Error types for taily

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every fatal condition a launch can end in
#[derive(Error, Debug)]
pub enum Error {
    /// Operation keyword is not one of the known commands
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// No ssh-agent could be reached
    #[error("ssh-agent unavailable: {0}")]
    AgentUnavailable(String),

    /// The agent returned no usable identities
    #[error("No credentials available from ssh-agent: {0}")]
    NoCredentials(String),

    /// Transport could not be opened or no identity was accepted
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Connection is up but refused to open a session channel
    #[error("Failed to open session: {0}")]
    SessionCreationFailed(String),

    /// Remote side rejected the pseudo-terminal request
    #[error("Request for pseudo terminal failed: {0}")]
    PtyRequestFailed(String),

    /// Remote command did not complete successfully
    #[error("Remote command failed: {0}")]
    RemoteCommand(RemoteFailure),

    /// Local terminal could not be switched or queried
    #[error("Terminal error: {0}")]
    TerminalMode(#[source] std::io::Error),

    /// Launch abandoned because the process received a signal
    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    /// Process exit code this error should terminate with
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::RemoteCommand(RemoteFailure::ExitStatus(status)) => {
                u8::try_from(*status).unwrap_or(u8::MAX).max(1)
            }
            Error::Interrupted => 130,
            _ => 1,
        }
    }
}

/// How a remote command failed once it was running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Command exited with a non-zero status
    ExitStatus(u32),
    /// Command was killed by a signal
    Signal {
        name: String,
        core_dumped: bool,
        message: String,
    },
    /// Transport went away or the server refused the command
    Transport(String),
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteFailure::ExitStatus(status) => write!(f, "exited with status {}", status),
            RemoteFailure::Signal {
                name,
                core_dumped,
                message,
            } => {
                write!(f, "killed by signal {}", name)?;
                if *core_dumped {
                    write!(f, " (core dumped)")?;
                }
                if !message.is_empty() {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
            RemoteFailure::Transport(message) => write!(f, "{}", message),
        }
    }
}
