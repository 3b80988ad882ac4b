//! Launch command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use taily_core::{launch, CrosstermTerminal, Error, Operation, SessionConfig, TargetIdentity};

/// Positional arguments plus the agent socket, as parsed from the command line
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub application: String,
    pub operation: String,
    pub environment: String,
    pub agent_socket: Option<PathBuf>,
}

impl LaunchRequest {
    /// Build the session configuration for this request's application
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(TargetIdentity::for_application(&self.application))
            .with_agent_socket(self.agent_socket.clone())
    }
}

/// Resolve the operation and run it on the application host
///
/// Returns the remote exit status. A signal received while the session runs
/// abandons it with [`Error::Interrupted`]; the terminal is restored on the
/// way out because the session future is dropped.
pub async fn launch_command(request: &LaunchRequest) -> Result<u32> {
    let operation: Operation = request.operation.parse()?;
    let command = operation.command(&request.application, &request.environment);
    let config = request.session_config();

    tracing::info!(
        operation = %operation,
        interactive = operation.is_interactive(),
        "Running '{}' on {}",
        command,
        config.target
    );

    let result = tokio::select! {
        result = launch(&config, &command, CrosstermTerminal) => result,
        signal = shutdown_signal() => {
            tracing::info!("Received {}, closing session", signal);
            Err(Error::Interrupted)
        }
    };

    result.with_context(|| format!("{} on {}", operation, config.target))
}

/// Resolve when the process is asked to stop
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut hup) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Failed to install signal handler: {}", e);
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = hup.recv() => "SIGHUP",
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}
