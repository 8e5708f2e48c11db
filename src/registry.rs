//! Thread-safe session registry using Papaya HashMap

use crate::auth_session::{AuthSession, SessionConfig};
use crate::error::Result;
use papaya::HashMap;
use std::sync::Arc;

/// Identifies a session: one vault owner on one node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub owner_did: String,
    pub node_url: String,
}

impl SessionKey {
    pub fn new(owner_did: &str, node_url: &str) -> Self {
        Self {
            owner_did: owner_did.to_string(),
            node_url: normalize_node_url(node_url),
        }
    }
}

pub(crate) fn normalize_node_url(node_url: &str) -> String {
    node_url.trim_end_matches('/').to_string()
}

/// Shares one [`AuthSession`] per (owner DID, node URL)
///
/// Every handle for the same pair goes through the same critical section and
/// the same token file.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<HashMap<SessionKey, Arc<AuthSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(HashMap::new()),
        }
    }

    /// Get the session for `config`, creating it on first use
    pub fn get_or_create(&self, config: SessionConfig) -> Result<Arc<AuthSession>> {
        let key = SessionKey::new(&config.owner_did, &config.node_url);
        if let Some(session) = self.sessions.pin().get(&key) {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(AuthSession::new(config)?);
        let sessions = self.sessions.pin();
        Ok(Arc::clone(sessions.get_or_insert(key, session)))
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<AuthSession>> {
        self.sessions.pin().get(key).cloned()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
