//! Interactive session engine
//!
//! Drives one launch end to end:
//!
//! 1. list identities from the ssh-agent
//! 2. connect and authenticate with the first identity the host accepts
//! 3. open a single session channel
//! 4. put the local terminal into raw mode (restored when the guard drops)
//! 5. request a PTY sized like the local terminal
//! 6. run the command, relaying stdin/stdout/stderr until it exits
//! 7. disconnect
//!
//! Nothing is retried and nothing times out: a step that fails ends the launch.

mod channel;
mod relay;

use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::Disconnect;
use russh_keys::key::PublicKey;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::agent::AgentCredentials;
use crate::config::{SessionConfig, TargetIdentity};
use crate::error::{Error, Result};
use crate::terminal::{RawModeGuard, TerminalControl};

pub use channel::RemoteSession;
pub use relay::SessionIo;

/// An authenticated SSH connection
pub struct Connection {
    handle: Handle<ClientHandler>,
    target: TargetIdentity,
}

impl Connection {
    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    /// Open the connection's single session channel
    pub async fn open_session(&self) -> Result<RemoteSession> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::SessionCreationFailed(e.to_string()))?;
        tracing::debug!("Opened session channel {:?}", channel.id());
        Ok(RemoteSession::new(channel))
    }

    /// Disconnect. Failures are logged and otherwise ignored.
    pub async fn close(self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!("Error while disconnecting from {}: {}", self.target, e);
        } else {
            tracing::debug!("Disconnected from {}", self.target);
        }
    }
}

/// Connect to the configured target and open a session on it
///
/// The agent is consulted first: without an agent or without identities no
/// network connection is attempted at all. If the session channel cannot be
/// opened the connection is closed before the error is returned.
///
/// # Arguments
/// * `config` - Target, agent socket and PTY parameters
///
/// # Returns
/// The authenticated connection and its single session channel.
///
/// # Errors
/// * [`Error::AgentUnavailable`] / [`Error::NoCredentials`] - agent problems,
///   reported before any connection is made
/// * [`Error::AuthenticationFailed`] - the host is unreachable or accepts
///   none of the agent's identities
/// * [`Error::SessionCreationFailed`] - the channel could not be opened
pub async fn authenticate_and_connect(
    config: &SessionConfig,
) -> Result<(Connection, RemoteSession)> {
    let credentials = AgentCredentials::load(config.agent_socket()).await?;
    let target = &config.target;

    tracing::info!("Connecting to {}", target);
    let ssh_config = Arc::new(Config::default());
    let handler = ClientHandler::new(target.host());
    let mut handle = client::connect(ssh_config, (target.host(), target.port()), handler)
        .await
        .map_err(|e| {
            Error::AuthenticationFailed(format!("cannot connect to {}: {}", target, e))
        })?;

    credentials.authenticate(&mut handle, target.user()).await?;

    let connection = Connection {
        handle,
        target: target.clone(),
    };

    match connection.open_session().await {
        Ok(session) => Ok((connection, session)),
        Err(e) => {
            connection.close().await;
            Err(e)
        }
    }
}

/// Run `command` on the configured target, attached to this process's
/// standard streams and terminal
///
/// Returns 0 once the command has succeeded; a non-zero exit is reported as
/// [`Error::RemoteCommand`].
pub async fn launch<T: TerminalControl>(
    config: &SessionConfig,
    command: &str,
    terminal: T,
) -> Result<u32> {
    launch_with_io(config, command, terminal, SessionIo::stdio()).await
}

/// [`launch`] with explicit local streams
///
/// # Arguments
/// * `config` - Target, agent socket and PTY parameters
/// * `command` - Shell command line run on the remote host
/// * `terminal` - Terminal switched to raw mode for the duration of the command
/// * `io` - Local streams relayed to and from the remote command
///
/// # Returns
/// `0` once the remote command has exited successfully. The terminal has been
/// restored by the time this returns, whatever the outcome.
///
/// # Errors
/// Everything [`authenticate_and_connect`] reports, plus
/// [`Error::TerminalMode`], [`Error::PtyRequestFailed`] and
/// [`Error::RemoteCommand`] for a non-zero exit, a signal or a lost connection.
pub async fn launch_with_io<T, I, O, E>(
    config: &SessionConfig,
    command: &str,
    terminal: T,
    io: SessionIo<I, O, E>,
) -> Result<u32>
where
    T: TerminalControl,
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let (connection, mut session) = authenticate_and_connect(config).await?;
    let outcome = interact(&mut session, config, command, terminal, io).await;
    tracing::debug!("Command finished on {}", connection.target());
    connection.close().await;
    outcome
}

async fn interact<T, I, O, E>(
    session: &mut RemoteSession,
    config: &SessionConfig,
    command: &str,
    terminal: T,
    io: SessionIo<I, O, E>,
) -> Result<u32>
where
    T: TerminalControl,
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let guard = RawModeGuard::enter(terminal)?;
    let (cols, rows) = guard.size()?;
    session.request_pty(&config.pty.with_size(cols, rows)).await?;
    session.run(command, io, guard.terminal()).await
}

/// russh client callbacks
pub struct ClientHandler {
    host: String,
}

impl ClientHandler {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
        }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    /// Any host key is accepted; the fingerprint is logged for diagnosis
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            "Host key for {}: {}",
            self.host,
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}
