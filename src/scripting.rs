//! Server-side scripts registered on a vault

use crate::auth_session::AuthSession;
use crate::error::{Result, VaultError};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

const SET_SUBCONDITION_PATH: &str = "/api/v1/scripting/set_subcondition";
const SET_SCRIPT_PATH: &str = "/api/v1/scripting/set_script";
const RUN_SCRIPT_PATH: &str = "/api/v1/scripting/run_script";

/// A step executed by the node when a script is called
///
/// The body is interpreted by the node; it is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executable {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub output: bool,
    pub body: Value,
}

impl Executable {
    pub fn new(kind: &str, name: Option<&str>, output: bool, body: Value) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.map(str::to_string),
            output,
            body,
        }
    }

    pub fn find(name: &str, collection: &str, filter: Value, output: bool) -> Self {
        Self::new("find", Some(name), output, json!({ "collection": collection, "filter": filter }))
    }

    pub fn insert(name: &str, collection: &str, document: Value) -> Self {
        Self::new("insert", Some(name), false, json!({ "collection": collection, "document": document }))
    }

    /// Runs several executables in order
    pub fn aggregated(name: &str, steps: Vec<Executable>) -> Self {
        let body = serde_json::to_value(steps).unwrap_or(Value::Array(Vec::new()));
        Self::new("aggregated", Some(name), false, body)
    }
}

/// Access condition evaluated before a script runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub body: Value,
}

impl Condition {
    pub fn query_has_results(name: &str, collection: &str, filter: Value) -> Self {
        Self {
            kind: "queryHasResults".to_string(),
            name: Some(name.to_string()),
            body: json!({ "collection": collection, "filter": filter }),
        }
    }

    pub fn and(name: &str, conditions: Vec<Condition>) -> Self {
        Self::combine("and", name, conditions)
    }

    pub fn or(name: &str, conditions: Vec<Condition>) -> Self {
        Self::combine("or", name, conditions)
    }

    fn combine(kind: &str, name: &str, conditions: Vec<Condition>) -> Self {
        Self {
            kind: kind.to_string(),
            name: Some(name.to_string()),
            body: serde_json::to_value(conditions).unwrap_or(Value::Array(Vec::new())),
        }
    }
}

/// Scripting API of one vault
#[derive(Clone)]
pub struct Scripting {
    session: Arc<AuthSession>,
}

impl Scripting {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    /// Register a named condition that scripts can reference
    pub async fn register_condition(&self, name: &str, condition: &Condition) -> Result<()> {
        let body = json!({ "conditionName": name, "condition": condition });
        self.post(SET_SUBCONDITION_PATH, body, name).await?;
        debug!(condition = %name, "Condition registered");
        Ok(())
    }

    /// Register (or replace) a script, optionally guarded by `access_condition`
    pub async fn register_script(
        &self,
        name: &str,
        access_condition: Option<&Condition>,
        executable: &Executable,
    ) -> Result<()> {
        let mut body = Map::new();
        body.insert("scriptName".to_string(), json!(name));
        if let Some(condition) = access_condition {
            body.insert("accessCondition".to_string(), serde_json::to_value(condition)?);
        }
        body.insert("executable".to_string(), serde_json::to_value(executable)?);

        self.post(SET_SCRIPT_PATH, Value::Object(body), name).await?;
        debug!(script = %name, "Script registered");
        Ok(())
    }

    /// Call a registered script; `params` are visible to it as `$params`
    pub async fn call<T: DeserializeOwned>(&self, name: &str, params: Option<Value>) -> Result<T> {
        let mut body = Map::new();
        body.insert("scriptName".to_string(), json!(name));
        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let response = self.post(RUN_SCRIPT_PATH, Value::Object(body), name).await?;
        Ok(response.json().await?)
    }

    async fn post(&self, endpoint: &str, body: Value, name: &str) -> Result<reqwest::Response> {
        self.session.ensure_valid().await?;
        let request = self
            .session
            .connection()
            .authorized(Method::POST, endpoint)
            .await
            .json(&body);
        self.session.dispatch(request).await.map_err(|e| match e {
            VaultError::Status { status: 404, .. } => VaultError::NotFound(name.to_string()),
            other => other,
        })
    }
}
