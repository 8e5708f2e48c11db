//! Authentication session with token caching, persistence and retry-on-401

use crate::challenge::{decode_claims, ChallengeVerifier};
use crate::connection::{check_response, error_for_status, Connection, StatusClass, AUTH_PATH, SIGN_IN_PATH};
use crate::error::{Result, VaultError};
use crate::registry::normalize_node_url;
use crate::shim::{AppContext, AuthenticationShim};
use crate::token_store::{LoadOutcome, TokenStore};
use crate::types::{now_secs, AuthState, SessionIdentity, TokenRecord};
use async_singleflight::Group;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const ENSURE_FLIGHT: &str = "ensure";
const RETRY_FLIGHT: &str = "retry";

/// Configuration for one session
#[derive(Clone)]
pub struct SessionConfig {
    /// DID of the vault owner
    pub owner_did: String,

    /// Base URL of the Hive node
    pub node_url: String,

    /// Supplies the instance DID document and the token directory
    pub context: Arc<dyn AppContext>,

    /// Signs challenges; without one the session stays anonymous
    pub shim: Option<Arc<dyn AuthenticationShim>>,

    /// Per-request timeout; none by default
    pub request_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(owner_did: &str, node_url: &str, context: Arc<dyn AppContext>) -> Self {
        Self {
            owner_did: owner_did.to_string(),
            node_url: normalize_node_url(node_url),
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
}

struct CachedToken {
    record: TokenRecord,
    identity: SessionIdentity,
}

/// Owns the credential of one (owner DID, node URL) pair
///
/// Restore, validity check, sign-in, persistence and header reconfiguration
/// all run inside one critical section per session. Concurrent callers that
/// find the token stale wait on the same in-flight attempt and share its
/// result.
pub struct AuthSession {
    owner_did: String,
    node_url: String,
    context: Arc<dyn AppContext>,
    shim: Option<Arc<dyn AuthenticationShim>>,
    verifier: ChallengeVerifier,
    token_store: TokenStore,
    connection: Arc<Connection>,
    /// Published only once a record is complete
    cached: RwLock<Option<CachedToken>>,
    critical_section: Mutex<()>,
    /// Singleflight group so concurrent callers share one sign-in attempt
    sign_in_singleflight: Group<Result<AuthState>, Infallible>,
}

impl AuthSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let node_url = normalize_node_url(&config.node_url);
        let connection = Connection::new(&node_url, config.request_timeout)?;
        let token_store = TokenStore::new(config.context.local_data_dir(), &config.owner_did, &node_url);

        Ok(Self {
            owner_did: config.owner_did,
            node_url,
            context: config.context,
            shim: config.shim,
            verifier: ChallengeVerifier::new(),
            token_store,
            connection: Arc::new(connection),
            cached: RwLock::new(None),
            critical_section: Mutex::new(()),
            sign_in_singleflight: Group::new(),
        })
    }

    /// Make sure a valid credential is installed before a vault call
    ///
    /// Restores the persisted token on first use and signs in when it is
    /// missing or expired.
    pub async fn ensure_valid(&self) -> Result<AuthState> {
        // Fast path: a valid published record already has its header installed
        if let Some(record) = self.valid_token().await {
            return Ok(AuthState::Authenticated(record));
        }

        self.do_refresh_singleflight(ENSURE_FLIGHT, false).await
    }

    /// Sign in again after a dependent call saw `status`
    ///
    /// Only 401 triggers a sign-in; returns whether one ran. The failed call
    /// is not resubmitted.
    pub async fn retry_on_unauthorized(&self, status: StatusCode) -> Result<bool> {
        if StatusClass::of(status) != StatusClass::Unauthorized {
            return Ok(false);
        }

        info!(owner_did = %self.owner_did, node_url = %self.node_url, "Vault call unauthorized, signing in again");
        self.do_refresh_singleflight(RETRY_FLIGHT, true).await?;
        Ok(true)
    }

    /// Send a dependent request built after [`AuthSession::ensure_valid`]
    ///
    /// A 401 runs the retry hook and then fails with `Unauthorized`; any other
    /// non-2xx fails with the server's message.
    pub async fn dispatch(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        match StatusClass::of(status) {
            StatusClass::Success => Ok(response),
            StatusClass::Unauthorized => {
                if let Err(e) = self.retry_on_unauthorized(status).await {
                    warn!(owner_did = %self.owner_did, error = %e, "Sign-in after 401 failed");
                }
                Err(VaultError::Unauthorized)
            }
            StatusClass::Failure => error_for_status(response).await,
        }
    }

    /// Log out: forget the in-memory token and delete the persisted one
    pub async fn remove_token(&self) -> Result<()> {
        let _guard = self.critical_section.lock().await;
        self.invalidate().await;
        self.token_store.delete()?;
        info!(owner_did = %self.owner_did, node_url = %self.node_url, "Token removed");
        Ok(())
    }

    pub async fn token(&self) -> Option<TokenRecord> {
        self.cached.read().await.as_ref().map(|c| c.record.clone())
    }

    pub async fn identity(&self) -> Option<SessionIdentity> {
        self.cached.read().await.as_ref().map(|c| c.identity.clone())
    }

    pub fn owner_did(&self) -> &str {
        &self.owner_did
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    async fn valid_token(&self) -> Option<TokenRecord> {
        let now = now_secs();
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|c| c.record.is_valid_at(now))
            .map(|c| c.record.clone())
    }

    async fn do_refresh_singleflight(&self, key: &str, force: bool) -> Result<AuthState> {
        // The flight value is the whole outcome so waiters see failures too
        loop {
            let (outcome, _, _shared) = self
                .sign_in_singleflight
                .work(key, async { Ok::<_, Infallible>(self.refresh_locked(force).await) })
                .await;

            match outcome {
                Some(outcome) => return outcome,
                // The caller running the flight was dropped; run it again
                None => debug!(owner_did = %self.owner_did, flight = %key, "Sign-in flight abandoned, retrying"),
            }
        }
    }

    /// The critical section: restore, check, sign in, persist, reconfigure
    async fn refresh_locked(&self, force: bool) -> Result<AuthState> {
        let _guard = self.critical_section.lock().await;

        if !force {
            if self.cached.read().await.is_none() {
                self.restore().await;
            }
            // Another flight may have signed in while we waited for the lock
            if let Some(record) = self.valid_token().await {
                return Ok(AuthState::Authenticated(record));
            }
        }

        match self.sign_in().await {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    owner_did = %self.owner_did,
                    node_url = %self.node_url,
                    error = %e,
                    "Sign-in failed"
                );
                self.invalidate().await;
                Err(e)
            }
        }
    }

    async fn restore(&self) {
        match self.token_store.load() {
            LoadOutcome::Loaded(persisted) => {
                let (record, identity) = persisted.into_parts();
                debug!(
                    owner_did = %self.owner_did,
                    expires_at = record.expires_at,
                    expired = record.is_expired(),
                    "Restored persisted token"
                );
                self.install(record, identity).await;
            }
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    path = %self.token_store.path().display(),
                    reason = %reason,
                    "Persisted token unreadable, treating as absent"
                );
            }
            LoadOutcome::Absent => {
                debug!(owner_did = %self.owner_did, "No persisted token");
            }
        }
    }

    /// Full sign-in flow: challenge -> verify -> approve -> node auth
    async fn sign_in(&self) -> Result<AuthState> {
        let Some(shim) = self.shim.as_ref() else {
            debug!(owner_did = %self.owner_did, "No authentication shim configured, staying anonymous");
            self.connection.clear_credential().await;
            return Ok(AuthState::Anonymous);
        };

        let document = self.context.app_instance_document();
        let instance_did = self
            .context
            .app_instance_did()
            .ok_or_else(|| VaultError::Configuration("app instance document has no id".to_string()))?;

        // Step 1: Request challenge
        let response = self
            .connection
            .request(Method::POST, SIGN_IN_PATH)
            .json(&json!({ "document": document }))
            .send()
            .await?;
        check_response!(response);
        let body: Value = response.json().await?;
        let challenge = string_field(&body, "challenge")?;

        // Step 2: Verify challenge before anything is signed
        let verification = self.verifier.inspect(&challenge, &instance_did, now_secs());
        if !verification.is_accepted() {
            return Err(VaultError::AuthenticationRejected(format!(
                "challenge verification failed: {verification:?}"
            )));
        }

        // Step 3: Approve
        let approval = shim
            .authenticate(self.context.as_ref(), &challenge)
            .await
            .map_err(|e| VaultError::AuthenticationRejected(format!("authentication shim failed: {e}")))?;

        // Step 4: Exchange approval for an access token
        let response = self
            .connection
            .request(Method::POST, AUTH_PATH)
            .json(&json!({ "jwt": approval }))
            .send()
            .await?;
        check_response!(response);
        let body: Value = response.json().await?;
        let access_token = string_field(&body, "access_token")?;

        // Step 5: Build, persist and publish the new record
        let claims = decode_claims(&access_token)?;
        let identity = claims.identity()?;
        let record = TokenRecord::new(access_token, claims.expires_at()?);

        if let Some(previous) = self.identity().await {
            if previous != identity {
                warn!(
                    owner_did = %self.owner_did,
                    previous_user_did = %previous.user_did,
                    user_did = %identity.user_did,
                    previous_app_instance_did = %previous.app_instance_did,
                    app_instance_did = %identity.app_instance_did,
                    "Session identity changed across sign-in"
                );
            }
        }

        self.token_store.save(&record, &identity)?;
        self.install(record.clone(), identity).await;

        info!(
            owner_did = %self.owner_did,
            node_url = %self.node_url,
            expires_at = record.expires_at,
            "Signed in"
        );
        Ok(AuthState::Authenticated(record))
    }

    /// Header first, then publish, so a published valid record always has its header
    async fn install(&self, record: TokenRecord, identity: SessionIdentity) {
        if record.is_valid_at(now_secs()) {
            self.connection.set_credential(&record).await;
        }
        *self.cached.write().await = Some(CachedToken { record, identity });
    }

    async fn invalidate(&self) {
        *self.cached.write().await = None;
        self.connection.clear_credential().await;
    }
}

fn string_field(body: &Value, name: &str) -> Result<String> {
    body.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VaultError::Protocol(format!("response has no {name}")))
}
