//! JWT claim decoding and challenge verification
//!
//! Signatures are not checked here. The node is reached over TLS and the
//! authentication shim validates the challenge issuer; this module only looks
//! at the audience and expiry claims.

use crate::error::{Result, VaultError};
use crate::types::{now_secs, SessionIdentity};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// `aud` may be a single string or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// The audience is exactly `did`; a list must hold that single entry
    pub fn is_exactly(&self, did: &str) -> bool {
        match self {
            Audience::One(aud) => aud == did,
            Audience::Many(auds) => matches!(auds.as_slice(), [aud] if aud == did),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            Audience::One(aud) => Some(aud),
            Audience::Many(auds) => auds.first().map(String::as_str),
        }
    }
}

/// Claims read from challenge and access tokens
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiry in epoch seconds
    pub exp: Option<i64>,
    pub aud: Option<Audience>,
    /// Application properties; the node sends them as a JSON-encoded string
    pub props: Option<Value>,
}

/// Decode the claims of `token` without verifying its signature
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| VaultError::Protocol(format!("malformed token: {e}")))
}

impl TokenClaims {
    /// Extract the session identity from access token claims
    pub fn identity(&self) -> Result<SessionIdentity> {
        let props = match &self.props {
            Some(Value::String(raw)) => serde_json::from_str::<Value>(raw)?,
            Some(value @ Value::Object(_)) => value.clone(),
            _ => return Err(VaultError::Protocol("access token has no props claim".to_string())),
        };

        let field = |name: &str| {
            props
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| VaultError::Protocol(format!("access token props missing {name}")))
        };

        let app_instance_did = self
            .aud
            .as_ref()
            .and_then(Audience::first)
            .ok_or_else(|| VaultError::Protocol("access token has no audience".to_string()))?
            .to_string();

        Ok(SessionIdentity {
            user_did: field("userDid")?,
            app_id: field("appDid")?,
            app_instance_did,
        })
    }

    pub fn expires_at(&self) -> Result<i64> {
        self.exp
            .ok_or_else(|| VaultError::Protocol("token has no expiration".to_string()))
    }
}

/// Why a challenge was accepted or refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Accepted,
    AudienceMismatch { expected: String, actual: Option<String> },
    Expired { exp: i64, now: i64 },
    MissingExpiration,
    Malformed(String),
}

impl Verification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verification::Accepted)
    }
}

/// Checks a sign-in challenge before it is handed to the shim
#[derive(Debug, Clone, Default)]
pub struct ChallengeVerifier;

impl ChallengeVerifier {
    pub fn new() -> Self {
        Self
    }

    /// `true` iff the challenge is addressed to `expected_audience` and not expired
    ///
    /// Undecodable challenges are rejected.
    pub fn verify(&self, challenge: &str, expected_audience: &str) -> bool {
        self.inspect(challenge, expected_audience, now_secs()).is_accepted()
    }

    pub fn inspect(&self, challenge: &str, expected_audience: &str, now: i64) -> Verification {
        let claims = match decode_claims(challenge) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Challenge could not be decoded, rejecting");
                return Verification::Malformed(e.to_string());
            }
        };

        let verification = match (&claims.aud, claims.exp) {
            (Some(aud), _) if !aud.is_exactly(expected_audience) => Verification::AudienceMismatch {
                expected: expected_audience.to_string(),
                actual: aud.first().map(str::to_string),
            },
            (None, _) => Verification::AudienceMismatch {
                expected: expected_audience.to_string(),
                actual: None,
            },
            (_, None) => Verification::MissingExpiration,
            (_, Some(exp)) if exp <= now => Verification::Expired { exp, now },
            _ => Verification::Accepted,
        };

        debug!(?verification, "Challenge inspected");
        verification
    }
}
