//! File-backed token storage, one JSON file per (owner DID, node URL)

use crate::error::{Result, VaultError};
use crate::types::{PersistedState, SessionIdentity, TokenRecord};
use sha3::{Digest, Sha3_256};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const TOKENS_DIR: &str = "tokens";

/// Result of reading the persisted token file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file on disk
    Absent,
    /// File exists but could not be read or parsed
    Corrupt(String),
    Loaded(PersistedState),
}

impl LoadOutcome {
    /// Collapse to the cached parts, treating a corrupt file as absent
    pub fn into_parts(self) -> Option<(TokenRecord, SessionIdentity)> {
        match self {
            LoadOutcome::Loaded(state) => Some(state.into_parts()),
            LoadOutcome::Absent | LoadOutcome::Corrupt(_) => None,
        }
    }
}

/// Persists the token record of one session
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store for `owner_did` on `node_url` under `data_dir`
    ///
    /// Nothing is touched on disk until the first [`TokenStore::save`].
    pub fn new(data_dir: &Path, owner_did: &str, node_url: &str) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(owner_did.as_bytes());
        hasher.update([0u8]);
        hasher.update(node_url.as_bytes());
        let file_name = format!("{}.json", hex::encode(hasher.finalize()));

        Self {
            path: data_dir.join(TOKENS_DIR).join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LoadOutcome {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return LoadOutcome::Absent,
            Err(e) => return LoadOutcome::Corrupt(format!("read failed: {e}")),
        };

        match serde_json::from_str::<PersistedState>(&contents) {
            Ok(state) => LoadOutcome::Loaded(state),
            Err(e) => LoadOutcome::Corrupt(format!("parse failed: {e}")),
        }
    }

    /// Write the record atomically: temp file in the same directory, then rename
    pub fn save(&self, record: &TokenRecord, identity: &SessionIdentity) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| VaultError::Storage(format!("invalid token path {}", self.path.display())))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| VaultError::Storage(format!("create {}: {e}", dir.display())))?;

        let contents = serde_json::to_vec_pretty(&PersistedState::new(record, identity))?;

        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| VaultError::Storage(format!("create temp file: {e}")))?;
        file.write_all(&contents)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| VaultError::Storage(format!("write temp file: {e}")))?;
        file.persist(&self.path)
            .map_err(|e| VaultError::Storage(format!("replace {}: {}", self.path.display(), e.error)))?;

        debug!(path = %self.path.display(), "Token file saved");
        Ok(())
    }

    /// Remove the file; a missing file is not an error
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Token file deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Storage(format!("delete {}: {e}", self.path.display()))),
        }
    }
}
