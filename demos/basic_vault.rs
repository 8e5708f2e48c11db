//! Basic vault example
//!
//! Usage:
//!   HIVE_NODE=http://localhost:5000 APPROVAL_JWT=<jwt> cargo run --example basic_vault
//!
//! `APPROVAL_JWT` stands in for a real DID signer: it must be a presentation
//! the node accepts for this app instance.

use async_trait::async_trait;
use hive_rs_client::{AppContext, AuthenticationShim, ClientConfig, ShimError, VaultClient};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct DemoContext {
    data_dir: PathBuf,
    instance_did: String,
}

impl AppContext for DemoContext {
    fn local_data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn app_instance_document(&self) -> Value {
        json!({ "id": self.instance_did })
    }
}

/// Hands back a pre-issued approval token
struct EnvShim {
    approval: String,
}

#[async_trait]
impl AuthenticationShim for EnvShim {
    async fn authenticate(&self, _context: &dyn AppContext, _challenge: &str) -> Result<String, ShimError> {
        Ok(self.approval.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let node_url = std::env::var("HIVE_NODE").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let owner_did = std::env::var("OWNER_DID").unwrap_or_else(|_| "did:elastos:owner".to_string());
    let instance_did = std::env::var("APP_INSTANCE_DID").unwrap_or_else(|_| "did:elastos:instance".to_string());
    let approval = std::env::var("APPROVAL_JWT").unwrap_or_default();

    println!("=== Hive Rust Client Example ===");
    println!("Node:  {}", node_url);
    println!("Owner: {}", owner_did);
    println!();

    let context = Arc::new(DemoContext {
        data_dir: std::env::temp_dir().join("hive-rs-client-demo"),
        instance_did,
    });
    let config = ClientConfig::new(context)
        .with_shim(Arc::new(EnvShim { approval }))
        .with_request_timeout(Duration::from_secs(30));
    let client = VaultClient::new(config);
    let vault = client.vault(&owner_did, &node_url)?;

    println!("Signing in (reuses the cached token when still valid)...");
    let state = vault.session().ensure_valid().await?;
    println!("✓ Authenticated: {}", state.is_authenticated());
    if let Some(identity) = vault.session().identity().await {
        println!("  User DID: {}", identity.user_did);
        println!("  App DID:  {}", identity.app_id);
    }
    println!();

    let files = vault.files();
    files.upload("demo/hello.txt", b"hello vault".to_vec()).await?;
    println!("✓ Uploaded demo/hello.txt");

    for info in files.list("demo").await? {
        println!("  - {} ({:?}, {} bytes)", info.name, info.kind, info.size);
    }
    println!("  SHA256: {}", files.hash("demo/hello.txt").await?);

    let contents = files.download("demo/hello.txt").await?;
    println!("✓ Downloaded: {}", String::from_utf8_lossy(&contents));

    files.delete("demo/hello.txt").await?;
    println!("✓ Deleted demo/hello.txt");

    client.logout(&owner_did, &node_url).await?;
    println!("✓ Logged out");

    Ok(())
}
