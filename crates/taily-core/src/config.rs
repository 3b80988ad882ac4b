//! Session configuration
//!
//! Everything the session engine needs from the outside world is carried in a
//! [`SessionConfig`] value. The CLI fills it from its arguments and the
//! environment, tests construct it directly.

use std::fmt;
use std::path::{Path, PathBuf};

use russh::Pty;

/// Environment variable naming the ssh-agent socket
pub const AGENT_SOCKET_ENV: &str = "SSH_AUTH_SOCK";

/// Domain every application host lives under
pub const HOST_DOMAIN: &str = "nine.ch";

/// SSH port used for every target
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Terminal type requested for the remote PTY
pub const DEFAULT_TERM: &str = "xterm-256color";

/// Input and output baud rate announced in the PTY modes
pub const DEFAULT_BAUD_RATE: u32 = 14400;

/// Remote login target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetIdentity {
    user: String,
    host: String,
    port: u16,
}

impl TargetIdentity {
    /// Create a target with an explicit user, host and port
    pub fn new(user: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port,
        }
    }

    /// Derive the target for an application: `<app>@<app>.nine.ch:22`
    pub fn for_application(application: &str) -> Self {
        Self::new(
            application,
            format!("{}.{}", application, HOST_DOMAIN),
            DEFAULT_SSH_PORT,
        )
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Parameters of the remote pseudo-terminal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    /// Value of `TERM` on the remote side
    pub term: String,
    /// Width in columns
    pub cols: u32,
    /// Height in rows
    pub rows: u32,
    /// Encoded terminal modes
    pub modes: Vec<(Pty, u32)>,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            cols: 80,
            rows: 24,
            modes: vec![
                (Pty::ECHO, 1),
                (Pty::TTY_OP_ISPEED, DEFAULT_BAUD_RATE),
                (Pty::TTY_OP_OSPEED, DEFAULT_BAUD_RATE),
            ],
        }
    }
}

impl PtyRequest {
    /// Same request, sized to the given terminal geometry
    pub fn with_size(&self, cols: u16, rows: u16) -> Self {
        Self {
            cols: u32::from(cols),
            rows: u32::from(rows),
            ..self.clone()
        }
    }
}

/// Configuration handed to the session engine
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where to log in
    pub target: TargetIdentity,
    /// ssh-agent socket, `None` when no agent is available
    pub agent_socket: Option<PathBuf>,
    /// Remote PTY parameters (size is filled in at negotiation time)
    pub pty: PtyRequest,
}

impl SessionConfig {
    /// Create a configuration without an agent socket
    pub fn new(target: TargetIdentity) -> Self {
        Self {
            target,
            agent_socket: None,
            pty: PtyRequest::default(),
        }
    }

    /// Set the agent socket path. An empty path counts as unset.
    pub fn with_agent_socket(mut self, socket: Option<PathBuf>) -> Self {
        self.agent_socket = socket.filter(|p| !p.as_os_str().is_empty());
        self
    }

    pub fn agent_socket(&self) -> Option<&Path> {
        self.agent_socket.as_deref()
    }
}
