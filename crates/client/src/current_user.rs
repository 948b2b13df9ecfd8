use std::sync::Arc;

use journal_core::types::UserId;

use crate::config::DevUserConfig;
use crate::session_store::SessionStore;

/// Resolves "who is using the app right now" without any I/O.
pub struct CurrentUserAccessor {
    store: Arc<SessionStore>,
    dev_user: DevUserConfig,
}

impl CurrentUserAccessor {
    pub fn new(store: Arc<SessionStore>, dev_user: DevUserConfig) -> Self {
        Self { store, dev_user }
    }

    /// The signed-in user's id, else the development override when one is
    /// enabled and valid.
    pub fn current_user_id(&self) -> Option<UserId> {
        if let Some(session) = self.store.load_sync() {
            return Some(session.user_id);
        }

        let dev_id = self.dev_user.parsed_user_id()?;
        tracing::warn!(
            email = self.dev_user.email.as_deref().unwrap_or("unknown"),
            "Using development user override",
        );
        Some(dev_id)
    }
}
