//! Identity collaborators supplied by the application

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Error type returned by an [`AuthenticationShim`]
pub type ShimError = Box<dyn std::error::Error + Send + Sync>;

/// Application environment the session runs in
pub trait AppContext: Send + Sync {
    /// Directory the token files are kept under
    fn local_data_dir(&self) -> &Path;

    /// DID document of this application instance, sent on sign-in
    fn app_instance_document(&self) -> Value;

    /// Subject of the application instance DID document
    fn app_instance_did(&self) -> Option<String> {
        self.app_instance_document()
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Turns a verified sign-in challenge into an approval token
///
/// Implementations issue a verifiable presentation for the challenge and
/// return it as a signed JWT. A session without a shim stays anonymous.
#[async_trait]
pub trait AuthenticationShim: Send + Sync {
    async fn authenticate(&self, context: &dyn AppContext, challenge: &str) -> Result<String, ShimError>;
}
