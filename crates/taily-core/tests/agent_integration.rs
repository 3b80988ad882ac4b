//! Agent and connection setup tests
//!
//! A minimal ssh-agent is served on a Unix socket in a temp directory so the
//! agent paths run without a real agent. A TCP listener stands in for the
//! remote host and is checked for connection attempts.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

use taily_core::agent::AgentCredentials;
use taily_core::{
    authenticate_and_connect, launch, Error, SessionConfig, TargetIdentity, TerminalControl,
};

/// SSH_AGENT_IDENTITIES_ANSWER with zero keys
const EMPTY_IDENTITIES: &[u8] = &[0, 0, 0, 5, 12, 0, 0, 0, 0];

/// SSH_AGENT_FAILURE
const AGENT_FAILURE: &[u8] = &[0, 0, 0, 1, 5];

/// Serve `reply` to every request on a fresh agent socket
fn spawn_fake_agent(dir: &Path, reply: &'static [u8]) -> PathBuf {
    let path = dir.join("agent.sock");
    let listener = UnixListener::bind(&path).expect("bind agent socket");

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                loop {
                    let mut len = [0u8; 4];
                    if stream.read_exact(&mut len).await.is_err() {
                        return;
                    }
                    let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
                    if stream.read_exact(&mut body).await.is_err() {
                        return;
                    }
                    if stream.write_all(reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    path
}

/// Local stand-in for the remote host
async fn stand_in_host() -> (TcpListener, TargetIdentity) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, TargetIdentity::new("billing", "127.0.0.1", port))
}

async fn assert_no_connection(listener: &TcpListener) {
    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should reach the host");
}

#[derive(Clone, Default)]
struct CountingTerminal {
    enabled: Arc<AtomicUsize>,
}

impl TerminalControl for CountingTerminal {
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        self.enabled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((80, 24))
    }
}

#[tokio::test]
async fn test_missing_agent_socket() {
    let (listener, target) = stand_in_host().await;
    let config = SessionConfig::new(target);

    match authenticate_and_connect(&config).await {
        Err(Error::AgentUnavailable(msg)) => assert!(msg.contains("SSH_AUTH_SOCK")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("connection should not succeed"),
    }
    assert_no_connection(&listener).await;
}

#[tokio::test]
async fn test_unreachable_agent_socket() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nobody-listens.sock");

    match AgentCredentials::load(Some(missing.as_path())).await {
        Err(Error::AgentUnavailable(msg)) => assert!(msg.contains("nobody-listens.sock")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("agent should be unavailable"),
    }
}

#[tokio::test]
async fn test_agent_without_identities() {
    let dir = tempfile::tempdir().unwrap();
    let socket = spawn_fake_agent(dir.path(), EMPTY_IDENTITIES);
    let (listener, target) = stand_in_host().await;
    let config = SessionConfig::new(target).with_agent_socket(Some(socket));

    match authenticate_and_connect(&config).await {
        Err(Error::NoCredentials(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("connection should not succeed"),
    }
    assert_no_connection(&listener).await;
}

#[tokio::test]
async fn test_agent_refusing_identity_request() {
    let dir = tempfile::tempdir().unwrap();
    let socket = spawn_fake_agent(dir.path(), AGENT_FAILURE);

    match AgentCredentials::load(Some(socket.as_path())).await {
        Err(Error::NoCredentials(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("agent should yield no credentials"),
    }
}

#[tokio::test]
async fn test_launch_without_agent_leaves_terminal_alone() {
    let (listener, target) = stand_in_host().await;
    let config = SessionConfig::new(target);
    let terminal = CountingTerminal::default();

    let result = launch(&config, "echo test", terminal.clone()).await;
    assert!(matches!(result, Err(Error::AgentUnavailable(_))));
    assert_eq!(terminal.enabled.load(Ordering::SeqCst), 0);
    assert_no_connection(&listener).await;
}
