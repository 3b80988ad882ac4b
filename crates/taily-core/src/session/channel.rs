//! The remote session channel: PTY negotiation and command execution

use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::relay::{
    spawn_input_pump, spawn_output_writer, LocalInput, SessionIo, INPUT_QUEUE_CAPACITY,
};
use crate::config::PtyRequest;
use crate::error::{Error, RemoteFailure, Result};
use crate::terminal::TerminalControl;

/// Extended data type code for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// One command-execution context on a connection
pub struct RemoteSession {
    channel: Channel<Msg>,
}

impl RemoteSession {
    pub(crate) fn new(channel: Channel<Msg>) -> Self {
        Self { channel }
    }

    /// Request a remote PTY and wait for the server's answer
    pub async fn request_pty(&mut self, pty: &PtyRequest) -> Result<()> {
        tracing::debug!(
            term = %pty.term,
            cols = pty.cols,
            rows = pty.rows,
            "Requesting pseudo terminal"
        );

        self.channel
            .request_pty(true, &pty.term, pty.cols, pty.rows, 0, 0, &pty.modes)
            .await
            .map_err(|e| Error::PtyRequestFailed(e.to_string()))?;

        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Success) => return Ok(()),
                Some(ChannelMsg::Failure) => {
                    return Err(Error::PtyRequestFailed(
                        "rejected by remote host".to_string(),
                    ))
                }
                Some(other) => {
                    tracing::debug!("Ignoring {:?} while waiting for PTY reply", other);
                }
                None => {
                    return Err(Error::PtyRequestFailed(
                        "channel closed before reply".to_string(),
                    ))
                }
            }
        }
    }

    /// Execute `command` and relay I/O until the remote side closes the channel
    ///
    /// # Arguments
    /// * `command` - Shell command line to execute
    /// * `io` - Local streams; stdin is forwarded, stdout and stderr receive the
    ///   remote output and extended data respectively
    /// * `terminal` - Queried for the new size whenever the local window changes
    ///
    /// # Returns
    /// `Ok(0)` only when the command exited with status 0. Both output streams
    /// have been flushed and the input pump has stopped when this returns.
    ///
    /// # Errors
    /// [`Error::RemoteCommand`] carrying the non-zero exit status, the signal
    /// that killed the command, or a transport failure.
    pub async fn run<I, O, E, T>(
        &mut self,
        command: &str,
        io: SessionIo<I, O, E>,
        terminal: &T,
    ) -> Result<u32>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
        T: TerminalControl,
    {
        tracing::debug!("Executing remote command: {}", command);
        self.channel.exec(true, command).await.map_err(|e| {
            Error::RemoteCommand(RemoteFailure::Transport(format!(
                "failed to send command: {}",
                e
            )))
        })?;

        let cancel = CancellationToken::new();
        let (input_tx, mut input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();

        let input_task = spawn_input_pump(io.stdin, input_tx, cancel.clone());
        let stdout_task = spawn_output_writer(stdout_rx, io.stdout);
        let stderr_task = spawn_output_writer(stderr_rx, io.stderr);

        let mut resize = ResizeWatcher::new();
        let mut outcome = CommandOutcome::default();
        let mut input_open = true;

        loop {
            tokio::select! {
                msg = self.channel.wait() => {
                    let Some(msg) = msg else { break };
                    match msg {
                        ChannelMsg::Data { data } => {
                            let _ = stdout_tx.send(data.to_vec());
                        }
                        ChannelMsg::ExtendedData { data, ext } => {
                            if ext == SSH_EXTENDED_DATA_STDERR {
                                let _ = stderr_tx.send(data.to_vec());
                            } else {
                                tracing::debug!("Dropping extended data of type {}", ext);
                            }
                        }
                        ChannelMsg::Success => tracing::debug!("Remote command started"),
                        ChannelMsg::Failure => {
                            outcome.rejected = true;
                            break;
                        }
                        ChannelMsg::ExitStatus { exit_status } => {
                            tracing::debug!("Remote command exited with status {}", exit_status);
                            outcome.exit_status = Some(exit_status);
                        }
                        ChannelMsg::ExitSignal {
                            signal_name,
                            core_dumped,
                            error_message,
                            ..
                        } => {
                            outcome.signal = Some(RemoteFailure::Signal {
                                name: format!("{:?}", signal_name),
                                core_dumped,
                                message: error_message,
                            });
                        }
                        ChannelMsg::Eof => tracing::debug!("Remote output closed"),
                        ChannelMsg::Close => break,
                        _ => {}
                    }
                }

                input = input_rx.recv(), if input_open => {
                    match input {
                        Some(LocalInput::Data(data)) => {
                            if let Err(e) = self.channel.data(&data[..]).await {
                                tracing::debug!("Failed to forward input: {}", e);
                                input_open = false;
                            }
                        }
                        Some(LocalInput::Eof) | None => {
                            input_open = false;
                            let _ = self.channel.eof().await;
                        }
                    }
                }

                Some(()) = resize.changed() => {
                    if let Ok((cols, rows)) = terminal.size() {
                        tracing::debug!(cols, rows, "Forwarding terminal resize");
                        let _ = self
                            .channel
                            .window_change(u32::from(cols), u32::from(rows), 0, 0)
                            .await;
                    }
                }
            }
        }

        // Stop reading input, then let both writers drain before returning so
        // all remote output is on screen before the terminal mode is restored.
        cancel.cancel();
        drop(input_rx);
        drop(stdout_tx);
        drop(stderr_tx);
        let _ = stdout_task.await;
        let _ = stderr_task.await;
        let _ = input_task.await;

        outcome.into_result()
    }
}

/// What the channel reported about the command's end
#[derive(Debug, Default)]
struct CommandOutcome {
    exit_status: Option<u32>,
    signal: Option<RemoteFailure>,
    rejected: bool,
}

impl CommandOutcome {
    fn into_result(self) -> Result<u32> {
        if self.rejected {
            return Err(Error::RemoteCommand(RemoteFailure::Transport(
                "remote host refused to execute the command".to_string(),
            )));
        }
        if let Some(signal) = self.signal {
            return Err(Error::RemoteCommand(signal));
        }
        match self.exit_status {
            Some(0) => Ok(0),
            Some(status) => Err(Error::RemoteCommand(RemoteFailure::ExitStatus(status))),
            None => Err(Error::RemoteCommand(RemoteFailure::Transport(
                "connection closed before the command exited".to_string(),
            ))),
        }
    }
}

/// Notifies when the local terminal changes size
struct ResizeWatcher {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl ResizeWatcher {
    fn new() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let signal = signal(SignalKind::window_change())
                .map_err(|e| tracing::debug!("Resize notifications unavailable: {}", e))
                .ok();
            Self { signal }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    async fn changed(&mut self) -> Option<()> {
        #[cfg(unix)]
        if let Some(signal) = self.signal.as_mut() {
            return signal.recv().await;
        }
        std::future::pending().await
    }
}
