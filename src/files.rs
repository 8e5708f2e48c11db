//! File operations on a vault

use crate::auth_session::AuthSession;
use crate::error::{Result, VaultError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const UPLOAD_PATH: &str = "/api/v1/files/upload/";
const DOWNLOAD_PATH: &str = "/api/v1/files/download";
const DELETE_PATH: &str = "/api/v1/files/delete";
const MOVE_PATH: &str = "/api/v1/files/move";
const COPY_PATH: &str = "/api/v1/files/copy";
const HASH_PATH: &str = "/api/v1/files/file/hash";
const LIST_PATH: &str = "/api/v1/files/list/folder";
const PROPERTIES_PATH: &str = "/api/v1/files/properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// Properties of a file or folder in the vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub size: u64,
    /// Modification time in epoch seconds
    #[serde(default)]
    pub last_modify: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    file_info_list: Vec<FileInfo>,
}

/// File API of one vault
#[derive(Clone)]
pub struct Files {
    session: Arc<AuthSession>,
}

impl Files {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    pub async fn upload(&self, path: &str, contents: Vec<u8>) -> Result<()> {
        self.session.ensure_valid().await?;
        let request = self
            .session
            .connection()
            .authorized(Method::POST, &format!("{UPLOAD_PATH}{}", path.trim_start_matches('/')))
            .await
            .body(contents);
        self.session.dispatch(request).await?;
        debug!(path = %path, "File uploaded");
        Ok(())
    }

    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        self.session.ensure_valid().await?;
        let request = self
            .session
            .connection()
            .authorized(Method::GET, DOWNLOAD_PATH)
            .await
            .query(&[("path", path)]);
        let response = self.session.dispatch(request).await.map_err(|e| not_found(e, path))?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.post(DELETE_PATH, json!({ "path": path })).await
    }

    pub async fn move_file(&self, source: &str, dest: &str) -> Result<()> {
        self.post(MOVE_PATH, json!({ "src_path": source, "dst_path": dest }))
            .await
    }

    pub async fn copy(&self, source: &str, dest: &str) -> Result<()> {
        self.post(COPY_PATH, json!({ "src_path": source, "dst_path": dest }))
            .await
    }

    /// SHA-256 of a remote file, as reported by the node
    pub async fn hash(&self, path: &str) -> Result<String> {
        let body: Value = self.get_json(HASH_PATH, path).await?;
        body.get("SHA256")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| VaultError::Protocol("hash response has no SHA256".to_string()))
    }

    pub async fn list(&self, folder: &str) -> Result<Vec<FileInfo>> {
        let list: FileList = self.get_json(LIST_PATH, folder).await?;
        Ok(list.file_info_list)
    }

    pub async fn stat(&self, path: &str) -> Result<FileInfo> {
        self.get_json(PROPERTIES_PATH, path).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<()> {
        self.session.ensure_valid().await?;
        let request = self
            .session
            .connection()
            .authorized(Method::POST, endpoint)
            .await
            .json(&body);
        self.session.dispatch(request).await?;
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str, path: &str) -> Result<T> {
        self.session.ensure_valid().await?;
        let request = self
            .session
            .connection()
            .authorized(Method::GET, endpoint)
            .await
            .query(&[("path", path)]);
        let response = self.session.dispatch(request).await?;
        Ok(response.json().await?)
    }
}

fn not_found(e: VaultError, path: &str) -> VaultError {
    match e {
        VaultError::Status { status: 404, .. } => VaultError::NotFound(path.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_info_from_node() {
        let info: FileInfo = serde_json::from_value(json!({
            "name": "docs/readme.txt",
            "type": "file",
            "size": 120,
            "last_modify": 1_600_000_000.5
        }))
        .unwrap();
        assert_eq!(info.kind, FileKind::File);
        assert_eq!(info.size, 120);

        let folder: FileInfo = serde_json::from_value(json!({ "name": "docs", "type": "folder" })).unwrap();
        assert_eq!(folder.kind, FileKind::Folder);
        assert_eq!(folder.last_modify, None);
    }

    #[test]
    fn test_not_found_mapping() {
        let e = not_found(
            VaultError::Status {
                status: 404,
                message: "no such file".to_string(),
            },
            "a.txt",
        );
        assert!(matches!(e, VaultError::NotFound(ref p) if p == "a.txt"));

        let e = not_found(VaultError::Unauthorized, "a.txt");
        assert!(matches!(e, VaultError::Unauthorized));
    }
}
