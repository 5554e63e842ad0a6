//! Conversational backend gateway.
//!
//! The backend is a webhook that accepts `{"message", "sessionId"}` and
//! answers with free text. Workflow tools wrap that text in different JSON
//! shapes (or none at all), so the reply is extracted by probing a fixed list
//! of keys before falling back to the serialized JSON or the raw body.

use crate::config::BackendConfig;
use crate::error::{Result, WidgetError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Keys probed for the reply text, in priority order.
pub const REPLY_KEYS: [&str; 5] = ["reply", "response", "output", "text", "message"];

/// Request/reply channel to the conversational backend.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Send one user message and return the backend's reply text.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Backend`] on transport failure or a non-2xx status.
    async fn send(&self, message: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    message: &'a str,
    #[serde(rename = "sessionId")]
    session_id: &'a str,
}

/// HTTP webhook implementation of [`BackendGateway`].
#[derive(Debug, Clone)]
pub struct WebhookGateway {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
}

impl WebhookGateway {
    /// Build a gateway for `config.endpoint` bound to `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, session_id: impl Into<String>) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(WidgetError::Config("backend.endpoint is empty".to_owned()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WidgetError::Backend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            session_id: session_id.into(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl BackendGateway for WebhookGateway {
    async fn send(&self, message: &str) -> Result<String> {
        let body = WebhookRequest {
            message,
            session_id: &self.session_id,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WidgetError::Backend(format!("webhook request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WidgetError::Backend(format!("failed to read webhook body: {e}")))?;

        if !status.is_success() {
            warn!(%status, body_len = text.len(), "webhook returned error status");
            return Err(WidgetError::Backend(format!("webhook returned HTTP {status}")));
        }

        debug!(body_len = text.len(), "webhook replied");
        Ok(extract_reply(&text))
    }
}

/// Extract the reply text from a webhook body.
///
/// * JSON object: the first truthy value among [`REPLY_KEYS`]; strings are
///   used as-is, other values are serialized. No match → the serialized object.
/// * JSON array: probed through its first element (workflow tools commonly
///   wrap single items in a list), else serialized.
/// * JSON string: the string itself.
/// * Anything else, including non-JSON bodies: the raw text.
pub fn extract_reply(body: &str) -> String {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return body.to_owned(),
    };

    match &value {
        Value::Object(_) => probe_reply_keys(&value).unwrap_or_else(|| value.to_string()),
        Value::Array(items) => items
            .first()
            .and_then(probe_reply_keys)
            .unwrap_or_else(|| value.to_string()),
        Value::String(s) => s.clone(),
        _ => body.to_owned(),
    }
}

fn probe_reply_keys(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    REPLY_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| is_truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
