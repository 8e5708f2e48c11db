//! Hive Rust Client
//!
//! A Rust client library for Hive vault nodes, with DID challenge/response
//! sign-in, persisted token caching and a retry-on-401 hook shared by the
//! file and scripting APIs.

pub mod auth_session;
pub mod challenge;
pub mod client;
pub mod connection;
pub mod error;
pub mod files;
pub mod registry;
pub mod scripting;
pub mod shim;
pub mod token_store;
pub mod types;


pub use auth_session::{AuthSession, SessionConfig};
pub use challenge::ChallengeVerifier;
pub use client::{ClientConfig, Vault, VaultClient};
pub use error::{ErrorKind, Result, VaultError};
pub use files::{FileInfo, FileKind, Files};
pub use registry::{SessionKey, SessionRegistry};
pub use scripting::{Condition, Executable, Scripting};
pub use shim::{AppContext, AuthenticationShim, ShimError};
pub use token_store::{LoadOutcome, TokenStore};
pub use types::{AuthState, SessionIdentity, TokenRecord};
