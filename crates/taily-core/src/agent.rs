//! ssh-agent credentials
//!
//! Private keys never leave the agent: identities are listed up front and
//! every signature during public-key authentication is produced by the agent.

use std::path::Path;

use russh::client::{Handle, Handler};
use russh_keys::agent::client::AgentClient;
use russh_keys::key::PublicKey;
use tokio::net::UnixStream;

use crate::error::{Error, Result};

/// A connected ssh-agent and the identities it holds
pub struct AgentCredentials {
    client: AgentClient<UnixStream>,
    identities: Vec<PublicKey>,
}

impl AgentCredentials {
    /// Connect to the agent at `socket` and list its identities
    ///
    /// # Arguments
    /// * `socket` - Path of the agent's Unix socket, `None` if unset
    ///
    /// # Returns
    /// The agent connection with at least one identity, in agent order.
    ///
    /// # Errors
    /// * [`Error::AgentUnavailable`] - no socket is configured or it cannot be
    ///   reached
    /// * [`Error::NoCredentials`] - the identity request failed or the agent
    ///   holds no identities
    pub async fn load(socket: Option<&Path>) -> Result<Self> {
        let socket = socket.ok_or_else(|| {
            Error::AgentUnavailable(format!(
                "{} is not set",
                crate::config::AGENT_SOCKET_ENV
            ))
        })?;

        tracing::debug!("Connecting to ssh-agent at {}", socket.display());
        let mut client = AgentClient::connect_uds(socket).await.map_err(|e| {
            Error::AgentUnavailable(format!("cannot reach {}: {}", socket.display(), e))
        })?;

        let identities = client
            .request_identities()
            .await
            .map_err(|e| Error::NoCredentials(format!("identity request failed: {}", e)))?;

        if identities.is_empty() {
            return Err(Error::NoCredentials("agent holds no identities".to_string()));
        }

        tracing::debug!("ssh-agent offered {} identities", identities.len());
        Ok(Self { client, identities })
    }

    /// Try every identity in agent order until the server accepts one
    pub async fn authenticate<H: Handler>(self, handle: &mut Handle<H>, user: &str) -> Result<()> {
        let mut agent = self.client;
        let mut last_error = None;

        for key in self.identities {
            let fingerprint = key.fingerprint();
            tracing::debug!("Offering key {} for user '{}'", fingerprint, user);

            let (returned, result) = handle.authenticate_future(user, key, agent).await;
            agent = returned;

            match result {
                Ok(true) => {
                    tracing::info!("Authenticated as '{}' with key {}", user, fingerprint);
                    return Ok(());
                }
                Ok(false) => tracing::debug!("Key {} rejected", fingerprint),
                Err(e) => {
                    tracing::debug!("Signing with key {} failed: {:?}", fingerprint, e);
                    last_error = Some(format!("{:?}", e));
                }
            }
        }

        Err(Error::AuthenticationFailed(match last_error {
            Some(e) => format!("no agent identity accepted for '{}' (last error: {})", user, e),
            None => format!("no agent identity accepted for '{}'", user),
        }))
    }
}
