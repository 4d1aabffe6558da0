//! Authenticated REST client.
//!
//! Every authenticated call reads the token fresh from [`TokenStore`], sends
//! it as a bearer credential and applies the session rules in one place:
//! - no token: navigate to login, fail with `NotAuthenticated`
//! - 401/403: clear the token, alert, navigate to login, fail with `Unauthorized`
//!
//! Callers must not repeat the redirect; it happens exactly once per call.

use crate::navigation::{Navigator, Route};
use crate::session::{CurrentSession, TokenStore};
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::{Config, Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    navigator: Arc<Navigator>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        navigator: Arc<Navigator>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            tokens,
            navigator,
        }
    }

    /// Client over HTTP using the configured backend and token file
    pub fn from_config(config: &Config, navigator: Arc<Navigator>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.api.timeout())?;
        Ok(Self::new(
            &config.api.base_url,
            Arc::new(transport),
            TokenStore::new(config.data.session_path()),
            navigator,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    /// Current identity, redirecting to login when there is none
    pub fn session(&self) -> Result<CurrentSession> {
        match self.tokens.current() {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::info!("No usable session: {}", e);
                self.navigator.navigate(Route::Login);
                Err(e)
            }
        }
    }

    /// Authenticated request returning the parsed JSON body (`Null` when empty)
    pub fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let session = self.session()?;
        let request = HttpRequest {
            method,
            url: self.url(path),
            bearer: Some(session.token),
            body,
        };
        let response = self.send(&request)?;

        if matches!(response.status, 401 | 403) {
            tracing::warn!(
                "{} {} rejected with {}; ending session",
                method.as_str(),
                path,
                response.status
            );
            if let Err(e) = self.tokens.clear() {
                tracing::error!("Failed to clear session token: {}", e);
            }
            self.navigator.session_expired();
            return Err(Error::Unauthorized {
                status: response.status,
            });
        }

        parse_body(response)
    }

    /// Request without credentials (login, signup)
    pub fn call_public(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let request = HttpRequest {
            method,
            url: self.url(path),
            bearer: None,
            body,
        };
        let response = self.send(&request)?;
        parse_body(response)
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        tracing::debug!("{} {}", request.method.as_str(), request.url);
        let response = self.transport.execute(request)?;
        tracing::debug!("{} {} -> {}", request.method.as_str(), request.url, response.status);
        Ok(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn parse_body(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(Error::Api {
            status: response.status,
            message: error_message(&response),
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// Backend `message` field when present, raw body otherwise
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| response.body.trim().to_string())
}

/// Pull a list out of a response
///
/// Accepts a bare array or an array under `key`. Anything else (null, an
/// object without the key, a non-array under the key) is an empty list.
pub fn list_from<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            other => {
                tracing::debug!("Expected array under {:?}, got {:?}; treating as empty", key, other);
                Vec::new()
            }
        },
        other => {
            tracing::debug!("Expected list payload, got {:?}; treating as empty", other);
            Vec::new()
        }
    };
    Ok(serde_json::from_value(Value::Array(items))?)
}

/// Pull one object out of a response, unwrapping the `key` envelope when present
pub fn object_from<T: DeserializeOwned>(value: Value, key: &str) -> Result<T> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };
    Ok(serde_json::from_value(inner)?)
}
