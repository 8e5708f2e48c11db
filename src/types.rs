//! Type definitions for authentication

use serde::{Deserialize, Serialize};

/// Token type sent in front of the access token in the `Authorization` header
pub const TOKEN_TYPE: &str = "token";

/// Current time in epoch seconds
pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Cached vault credential
///
/// Replaced wholesale on every sign-in, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    /// Always empty for DID sign-in, kept for file compatibility
    pub refresh_token: String,
    /// Expiry in epoch seconds
    pub expires_at: i64,
    pub token_type: String,
}

impl TokenRecord {
    pub fn new(access_token: String, expires_at: i64) -> Self {
        Self {
            access_token,
            refresh_token: String::new(),
            expires_at,
            token_type: TOKEN_TYPE.to_string(),
        }
    }

    /// A record is valid iff it carries an access token and `now < expires_at`
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.access_token.is_empty() && now < self.expires_at
    }

    /// Check if access token is expired (or empty)
    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(now_secs())
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Identity claims carried by the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_did: String,
    pub app_id: String,
    pub app_instance_did: String,
}

/// On-disk form of a token record plus its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at: i64,
    pub token_type: String,
    pub user_did: String,
    pub app_id: String,
    pub app_instance_did: String,
}

impl PersistedState {
    pub fn new(record: &TokenRecord, identity: &SessionIdentity) -> Self {
        Self {
            access_token: record.access_token.clone(),
            refresh_token: record.refresh_token.clone(),
            expires_at: record.expires_at,
            token_type: record.token_type.clone(),
            user_did: identity.user_did.clone(),
            app_id: identity.app_id.clone(),
            app_instance_did: identity.app_instance_did.clone(),
        }
    }

    pub fn into_parts(self) -> (TokenRecord, SessionIdentity) {
        (
            TokenRecord {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at: self.expires_at,
                token_type: self.token_type,
            },
            SessionIdentity {
                user_did: self.user_did,
                app_id: self.app_id,
                app_instance_did: self.app_instance_did,
            },
        )
    }
}

/// Outcome of [`crate::AuthSession::ensure_valid`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// A valid credential is cached and installed on the connection
    Authenticated(TokenRecord),
    /// No authentication shim is configured; requests go out without a credential
    Anonymous,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}
