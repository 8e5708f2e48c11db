//! Client entry points: one `VaultClient` per application, one `Vault` per owner and node

use crate::auth_session::{AuthSession, SessionConfig};
use crate::error::Result;
use crate::files::Files;
use crate::registry::{SessionKey, SessionRegistry};
use crate::scripting::Scripting;
use crate::shim::{AppContext, AuthenticationShim};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Configuration for the vault client
#[derive(Clone)]
pub struct ClientConfig {
    /// Supplies the instance DID document and the token directory
    pub context: Arc<dyn AppContext>,

    /// Signs sign-in challenges. Without a shim, vault calls go out anonymous.
    pub shim: Option<Arc<dyn AuthenticationShim>>,

    /// Per-request timeout applied to every node connection
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(context: Arc<dyn AppContext>) -> Self {
        Self {
            context,
            shim: None,
            request_timeout: None,
        }
    }

    pub fn with_shim(mut self, shim: Arc<dyn AuthenticationShim>) -> Self {
        self.shim = Some(shim);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn session_config(&self, owner_did: &str, node_url: &str) -> SessionConfig {
        SessionConfig {
            shim: self.shim.clone(),
            request_timeout: self.request_timeout,
            ..SessionConfig::new(owner_did, node_url, Arc::clone(&self.context))
        }
    }
}

/// Hands out vault handles that share one session per (owner DID, node URL)
pub struct VaultClient {
    config: ClientConfig,
    registry: SessionRegistry,
}

impl VaultClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
        }
    }

    pub fn vault(&self, owner_did: &str, node_url: &str) -> Result<Vault> {
        let session = self
            .registry
            .get_or_create(self.config.session_config(owner_did, node_url))?;
        Ok(Vault { session })
    }

    /// Remove the cached and persisted token for the pair
    ///
    /// Existing `Vault` handles stay usable and sign in again on next use.
    pub async fn logout(&self, owner_did: &str, node_url: &str) -> Result<()> {
        let key = SessionKey::new(owner_did, node_url);
        match self.registry.get(&key) {
            Some(session) => session.remove_token().await,
            None => {
                let session = AuthSession::new(self.config.session_config(owner_did, node_url))?;
                session.remove_token().await
            }
        }?;
        info!(owner_did = %owner_did, node_url = %key.node_url, "Logged out");
        Ok(())
    }
}

/// A vault owned by one DID on one node
#[derive(Clone)]
pub struct Vault {
    session: Arc<AuthSession>,
}

impl Vault {
    pub fn files(&self) -> Files {
        Files::new(Arc::clone(&self.session))
    }

    pub fn scripting(&self) -> Scripting {
        Scripting::new(Arc::clone(&self.session))
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn owner_did(&self) -> &str {
        self.session.owner_did()
    }

    pub fn node_url(&self) -> &str {
        self.session.node_url()
    }
}
