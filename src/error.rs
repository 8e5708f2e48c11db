//! Error types for the Hive client

use std::sync::Arc;
use thiserror::Error;

/// Client error types
///
/// Sources are kept behind `Arc` so one sign-in result can be shared with
/// every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum VaultError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of a [`VaultError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransportFailure,
    ProtocolFailure,
    AuthenticationRejected,
    Unauthorized,
    StorageFailure,
    NotFound,
    Configuration,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Http(_) | VaultError::Status { .. } => ErrorKind::TransportFailure,
            VaultError::Protocol(_) | VaultError::Serialization(_) => ErrorKind::ProtocolFailure,
            VaultError::AuthenticationRejected(_) => ErrorKind::AuthenticationRejected,
            VaultError::Unauthorized => ErrorKind::Unauthorized,
            VaultError::Storage(_) => ErrorKind::StorageFailure,
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(e: reqwest::Error) -> Self {
        VaultError::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
