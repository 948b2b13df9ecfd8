//! Sign-up flow: create the account, initialize it, and sign the user in
//! when the backend hands back a session straight away.

use std::sync::Arc;

use journal_core::types::UserId;

use crate::auth::AuthApi;
use crate::error::ClientResult;
use crate::initializer::UserInitializer;
use crate::retry::RetryPolicy;
use crate::session_store::SessionStore;

/// How a successful registration left the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Tokens were issued and the session is now current.
    SessionEstablished { user_id: UserId },
    /// The account exists but the email must be confirmed before the
    /// user can sign in.
    ConfirmationRequired { user_id: UserId },
}

impl RegistrationOutcome {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::SessionEstablished { user_id } | Self::ConfirmationRequired { user_id } => {
                *user_id
            }
        }
    }
}

pub struct RegisterOrchestrator {
    auth: Arc<dyn AuthApi>,
    initializer: Arc<UserInitializer>,
    store: Arc<SessionStore>,
    retry: RetryPolicy,
}

impl RegisterOrchestrator {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        initializer: Arc<UserInitializer>,
        store: Arc<SessionStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            auth,
            initializer,
            store,
            retry,
        }
    }

    /// Register a new account.
    ///
    /// The account is initialized before any session is established, so a
    /// user is never signed in to an account whose records are missing.
    /// Once the backend accepts the sign-up, a session cached for another
    /// user is dropped: initialization must not run under that user's
    /// token, and only the new account may end up signed in.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<RegistrationOutcome> {
        let response = self
            .retry
            .execute(|| self.auth.sign_up(email, password))
            .await?;
        let user_id = response.user_id()?;

        if let Some(previous) = self.store.load_sync() {
            tracing::info!(
                previous_user_id = %previous.user_id,
                %user_id,
                "Dropping previous session for new account",
            );
            self.store.destroy();
        }

        self.initializer.ensure_initialized(user_id).await?;

        if !response.has_session_tokens() {
            tracing::info!(%user_id, "Registered, email confirmation pending");
            return Ok(RegistrationOutcome::ConfirmationRequired { user_id });
        }

        self.auth.set_session(&response).await?;
        tracing::info!(%user_id, "Registered and signed in");
        Ok(RegistrationOutcome::SessionEstablished { user_id })
    }
}
