//! Remote authentication: sign-up, sign-in, sign-out, token refresh and
//! password management against the backend's auth endpoints.
//!
//! [`AuthApi`] is the seam the orchestrators depend on; [`RemoteAuthClient`]
//! is the HTTP implementation. A successful sign-in or refresh is written
//! to the [`SessionStore`] before the call returns. Sign-up never is; the
//! register flow decides whether the returned tokens become the session.

use std::sync::Arc;

use async_trait::async_trait;
use journal_core::session::Session;
use journal_core::types::UserId;
use reqwest::Method;
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};
use crate::rest::RestClient;
use crate::session_store::SessionStore;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body returned by sign-up, sign-in and refresh.
///
/// Sign-up with email confirmation enabled answers with the bare user
/// object instead of a session, so `id`/`email` may appear at the top
/// level and every token field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<RemoteUser>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AuthResponse {
    /// The authenticated user's id.
    ///
    /// A missing, blank or non-UUID id is a [`ClientError::Protocol`].
    pub fn user_id(&self) -> ClientResult<UserId> {
        let raw = self
            .user
            .as_ref()
            .and_then(|user| non_empty(&user.id))
            .or_else(|| non_empty(&self.id))
            .ok_or_else(|| ClientError::Protocol("no user ID returned".into()))?;

        raw.parse()
            .map_err(|_| ClientError::Protocol(format!("invalid user ID returned: {raw}")))
    }

    pub fn email(&self) -> Option<String> {
        self.user
            .as_ref()
            .and_then(|user| non_empty(&user.email))
            .or_else(|| non_empty(&self.email))
            .map(str::to_string)
    }

    /// Both an access and a refresh token are present.
    pub fn has_session_tokens(&self) -> bool {
        non_empty(&self.access_token).is_some() && non_empty(&self.refresh_token).is_some()
    }

    /// Build the [`Session`] these tokens describe.
    pub fn to_session(&self) -> ClientResult<Session> {
        let user_id = self.user_id()?;
        let (Some(access), Some(refresh)) =
            (non_empty(&self.access_token), non_empty(&self.refresh_token))
        else {
            return Err(ClientError::Protocol(
                "response carries no session tokens".into(),
            ));
        };

        let session = Session::from_tokens(
            access.to_string(),
            refresh.to_string(),
            user_id,
            self.expires_at,
            self.expires_in,
        )?;
        Ok(session.with_email(self.email()))
    }
}

// ---------------------------------------------------------------------------
// AuthApi
// ---------------------------------------------------------------------------

/// Remote authentication operations.
///
/// Failures the backend classifies (bad credentials, weak password,
/// throttling) surface as [`ClientError::Auth`].
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthResponse>;

    /// Password sign-in. On success the session is already current.
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthResponse>;

    /// Revoke the current session remotely and forget it locally. The local
    /// session is dropped even when the remote call fails.
    async fn sign_out(&self) -> ClientResult<()>;

    /// Exchange a refresh token for a new session and make it current.
    async fn refresh_session(&self, refresh_token: &str) -> ClientResult<Session>;

    /// Change the password of the signed-in user.
    async fn update_password(&self, new_password: &str) -> ClientResult<()>;

    /// Make the tokens in `response` the current session.
    async fn set_session(&self, response: &AuthResponse) -> ClientResult<Session>;

    /// Ask the backend to email a password reset link.
    async fn request_password_reset(&self, email: &str) -> ClientResult<()>;
}

// ---------------------------------------------------------------------------
// RemoteAuthClient
// ---------------------------------------------------------------------------

pub struct RemoteAuthClient {
    rest: RestClient,
    store: Arc<SessionStore>,
}

impl RemoteAuthClient {
    pub fn new(rest: RestClient, store: Arc<SessionStore>) -> Self {
        Self { rest, store }
    }

    async fn post_credentials(&self, url: &str, body: serde_json::Value) -> ClientResult<AuthResponse> {
        let response = self
            .rest
            .request(Method::POST, url, None)
            .json(&body)
            .send()
            .await?;
        RestClient::parse_auth_response(response).await
    }
}

#[async_trait]
impl AuthApi for RemoteAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.post_credentials(&self.rest.auth_url("signup"), body).await?;

        tracing::info!(
            user_id = ?response.user_id().ok(),
            has_session = response.has_session_tokens(),
            "Sign-up accepted",
        );
        Ok(response)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .post_credentials(&self.rest.auth_url("token?grant_type=password"), body)
            .await?;

        // A body without a usable user id is left for the caller to reject.
        match response.to_session() {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, "Signed in");
                self.store.save(&session);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-in response did not describe a session");
            }
        }
        Ok(response)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        let Some(session) = self.store.load_sync() else {
            self.store.destroy();
            return Ok(());
        };

        let remote: ClientResult<()> = async {
            let response = self
                .rest
                .request(Method::POST, &self.rest.auth_url("logout"), Some(&session.access_token))
                .send()
                .await?;
            RestClient::ensure_auth_success(response).await.map(|_| ())
        }
        .await;

        self.store.destroy();
        tracing::info!(user_id = %session.user_id, remote_ok = remote.is_ok(), "Signed out");
        remote
    }

    async fn refresh_session(&self, refresh_token: &str) -> ClientResult<Session> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .post_credentials(&self.rest.auth_url("token?grant_type=refresh_token"), body)
            .await?;

        let session = response.to_session()?;
        self.store.save(&session);
        tracing::debug!(user_id = %session.user_id, expires_at = %session.expires_at, "Session refreshed");
        Ok(session)
    }

    async fn update_password(&self, new_password: &str) -> ClientResult<()> {
        let session = self.store.load_sync().ok_or(ClientError::NotAuthenticated)?;

        let response = self
            .rest
            .request(Method::PUT, &self.rest.auth_url("user"), Some(&session.access_token))
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;
        RestClient::ensure_auth_success(response).await?;

        tracing::info!(user_id = %session.user_id, "Password updated");
        Ok(())
    }

    async fn set_session(&self, response: &AuthResponse) -> ClientResult<Session> {
        let session = response.to_session()?;
        self.store.save(&session);
        Ok(session)
    }

    async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        let response = self
            .rest
            .request(Method::POST, &self.rest.auth_url("recover"), None)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        RestClient::ensure_auth_success(response).await?;

        tracing::info!("Password reset requested");
        Ok(())
    }
}
