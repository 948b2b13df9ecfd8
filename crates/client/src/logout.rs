use std::sync::Arc;

use crate::auth::AuthApi;
use crate::session_store::SessionStore;

/// Signs the user out. Always succeeds locally.
pub struct LogoutHandler {
    auth: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
}

impl LogoutHandler {
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<SessionStore>) -> Self {
        Self { auth, store }
    }

    /// Revoke the session remotely when possible and drop it locally.
    ///
    /// A failed remote sign-out is logged and otherwise ignored.
    pub async fn logout(&self) {
        let user_id = self.store.load_sync().map(|s| s.user_id);

        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(?user_id, error = %e, "Remote sign-out failed, clearing local session anyway");
        }
        self.store.destroy();

        tracing::info!(?user_id, "Logged out");
    }
}
