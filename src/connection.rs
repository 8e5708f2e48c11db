//! HTTP connection to a Hive node

use crate::error::{Result, VaultError};
use crate::types::TokenRecord;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;

pub const SIGN_IN_PATH: &str = "/api/v1/did/sign_in";
pub const AUTH_PATH: &str = "/api/v1/did/auth";

/// Check HTTP response status and return a `Status` error if not successful
macro_rules! check_response {
    ($response:expr) => {
        if !$response.status().is_success() {
            let status = $response.status();
            let message = $response.text().await.unwrap_or_default();
            return Err($crate::error::VaultError::Status {
                status: status.as_u16(),
                message,
            });
        }
    };
}

pub(crate) use check_response;

/// Connection to one node, carrying the current bearer credential
#[derive(Debug)]
pub struct Connection {
    base_url: String,
    http_client: Client,
    authorization: RwLock<Option<String>>,
}

impl Connection {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| VaultError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            authorization: RwLock::new(None),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Install `record` as the bearer credential for subsequent requests
    pub async fn set_credential(&self, record: &TokenRecord) {
        *self.authorization.write().await = Some(record.authorization());
    }

    pub async fn clear_credential(&self) {
        *self.authorization.write().await = None;
    }

    pub async fn credential(&self) -> Option<String> {
        self.authorization.read().await.clone()
    }

    /// Request without a credential, used by the sign-in endpoints
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    /// Request carrying the current credential, if any
    pub async fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request(method, path);
        match self.authorization.read().await.as_deref() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}

/// Status classes a dependent call cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    Failure,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        if status.is_success() {
            StatusClass::Success
        } else if status == StatusCode::UNAUTHORIZED {
            StatusClass::Unauthorized
        } else {
            StatusClass::Failure
        }
    }
}

/// Turn a non-2xx response into a `Status` error carrying the body
pub async fn error_for_status(response: Response) -> Result<Response> {
    check_response!(response);
    Ok(response)
}
