//! Thin HTTP layer over the backend's auth and data endpoints.
//!
//! Every request carries the project's anon key in the `apikey` header and
//! a bearer token: the caller's access token when signed in, the anon key
//! otherwise. Failure bodies are decoded into [`AuthError`] for auth
//! endpoints and [`ClientError::Api`] for everything else.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::{AuthError, ClientError, ClientResult};

/// HTTP client for one backend project. Cheap to clone.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RestClient {
    /// Create a client whose requests time out after `timeout`.
    ///
    /// * `base_url` - Project URL, e.g. `https://abc.supabase.co`.
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, anon_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of an auth endpoint, e.g. `auth_url("signup")`.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// URL of a data endpoint, e.g. `rest_url("rpc/initialize_new_user")`.
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    /// Start a request with the project headers attached.
    ///
    /// `access_token` of `None` sends the anon key as the bearer token.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    // ---- response helpers ----

    /// Pass a 2xx response through, or turn the failure into
    /// [`ClientError::Api`].
    pub async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = read_body(response).await;
        let (code, message) = error_fields(status, &body);
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Like [`ensure_success`](Self::ensure_success) for auth endpoints:
    /// failures become [`ClientError::Auth`].
    pub async fn ensure_auth_success(
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = read_body(response).await;
        let (code, message) = error_fields(status, &body);
        Err(AuthError::new(Some(status.as_u16()), code, message).into())
    }

    /// Decode a successful JSON body.
    pub async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Decode a successful JSON body from an auth endpoint.
    pub async fn parse_auth_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let response = Self::ensure_auth_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn read_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}

/// Extract `(code, message)` from an error body.
///
/// Auth endpoints report the text under `error_description`, `msg` or
/// `message` depending on the failure, and the data API under `message`.
/// The code may be a string or, on older servers, the numeric status.
fn error_fields(status: reqwest::StatusCode, body: &str) -> (Option<String>, String) {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        }
    };

    let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return (None, fallback());
    };

    let message = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| {
            fields
                .get(*key)
                .and_then(|v| v.as_str())
                .filter(|msg| !msg.is_empty())
        })
        .map(str::to_string)
        .unwrap_or_else(fallback);

    let code = ["error_code", "code"]
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

    (code, message)
}
