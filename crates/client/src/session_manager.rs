//! Keeps the current session usable: restores it at startup and refreshes
//! the access token before it expires.
//!
//! When the backend rejects the refresh token (revoked, already used, or
//! the account was deleted elsewhere) the local session is destroyed and
//! callers see [`ClientError::NotAuthenticated`].
//!
//! Refresh tokens are single use, so refreshes are serialized: a caller
//! that waited on another caller's refresh reuses its result.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use journal_core::session::Session;
use tokio::sync::Mutex;

use crate::auth::AuthApi;
use crate::error::{ClientError, ClientResult};
use crate::session_store::SessionStore;

/// Refresh once the access token has less than this left.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    refresh_margin: chrono::Duration,
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<SessionStore>, refresh_margin: Duration) -> Self {
        Self {
            auth,
            store,
            refresh_margin: chrono::Duration::from_std(refresh_margin)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Load the persisted session at startup.
    ///
    /// An expired session is refreshed immediately. A session that can
    /// no longer be refreshed is discarded; transient refresh failures keep
    /// it so a later call can try again.
    pub async fn restore(&self) -> Option<Session> {
        let session = self.store.load_async().await?;

        if !session.is_expired_at(Utc::now()) {
            tracing::info!(user_id = %session.user_id, "Session restored");
            return Some(session);
        }

        match self.refresh(&session).await {
            Ok(fresh) => Some(fresh),
            Err(ClientError::NotAuthenticated) => None,
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Could not refresh restored session");
                Some(session)
            }
        }
    }

    /// The current session, refreshed first if it is about to expire.
    pub async fn valid_session(&self) -> ClientResult<Session> {
        let session = self.store.load_sync().ok_or(ClientError::NotAuthenticated)?;

        if !session.expires_within(Utc::now(), self.refresh_margin) {
            return Ok(session);
        }
        self.refresh(&session).await
    }

    async fn refresh(&self, session: &Session) -> ClientResult<Session> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have rotated or dropped the session meanwhile.
        match self.store.load_sync() {
            None => return Err(ClientError::NotAuthenticated),
            Some(current) if current.refresh_token != session.refresh_token => {
                tracing::debug!(user_id = %current.user_id, "Session already refreshed");
                return Ok(current);
            }
            Some(_) => {}
        }

        match self.auth.refresh_session(&session.refresh_token).await {
            Ok(fresh) => Ok(fresh),
            Err(ClientError::Auth(e)) if e.is_session_invalid() => {
                tracing::warn!(
                    user_id = %session.user_id,
                    error = %e,
                    "Refresh token rejected, discarding session",
                );
                self.store.destroy();
                Err(ClientError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }
}
