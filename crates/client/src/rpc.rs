//! Stored-procedure calls through the data API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::ClientResult;
use crate::rest::RestClient;
use crate::session_store::SessionStore;

/// Invokes a named server-side procedure and returns its raw body.
///
/// The body is handed back as text so callers can apply their own
/// (sometimes lenient) decoding.
#[async_trait]
pub trait RpcApi: Send + Sync {
    async fn call(&self, function: &str, params: serde_json::Value) -> ClientResult<String>;
}

/// [`RpcApi`] over `POST /rest/v1/rpc/{function}`, authorized as the
/// current session's user.
pub struct PostgrestRpc {
    rest: RestClient,
    store: Arc<SessionStore>,
}

impl PostgrestRpc {
    pub fn new(rest: RestClient, store: Arc<SessionStore>) -> Self {
        Self { rest, store }
    }
}

#[async_trait]
impl RpcApi for PostgrestRpc {
    async fn call(&self, function: &str, params: serde_json::Value) -> ClientResult<String> {
        let session = self.store.load_sync();
        let url = self.rest.rest_url(&format!("rpc/{function}"));

        tracing::debug!(function, authenticated = session.is_some(), "Calling procedure");

        let response = self
            .rest
            .request(
                Method::POST,
                &url,
                session.as_ref().map(|s| s.access_token.as_str()),
            )
            .json(&params)
            .send()
            .await?;
        let response = RestClient::ensure_success(response).await?;
        Ok(response.text().await?)
    }
}
