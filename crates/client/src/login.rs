//! Sign-in flow: authenticate, then make sure the account is initialized.

use std::sync::Arc;

use journal_core::types::UserId;
use tokio::sync::watch;

use crate::auth::AuthApi;
use crate::error::ClientResult;
use crate::initializer::UserInitializer;
use crate::retry::RetryPolicy;

/// Progress of the most recent login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    SigningIn,
    Initializing,
    Complete,
    Failed,
}

pub struct LoginOrchestrator {
    auth: Arc<dyn AuthApi>,
    initializer: Arc<UserInitializer>,
    retry: RetryPolicy,
    state: watch::Sender<LoginState>,
}

impl LoginOrchestrator {
    pub fn new(auth: Arc<dyn AuthApi>, initializer: Arc<UserInitializer>, retry: RetryPolicy) -> Self {
        let (state, _) = watch::channel(LoginState::Idle);
        Self {
            auth,
            initializer,
            retry,
            state,
        }
    }

    pub fn state(&self) -> LoginState {
        *self.state.borrow()
    }

    /// Observe state transitions (e.g. to drive a progress indicator).
    pub fn subscribe(&self) -> watch::Receiver<LoginState> {
        self.state.subscribe()
    }

    /// Sign in with email and password and initialize the account.
    ///
    /// Rate-limited sign-in attempts are retried per the [`RetryPolicy`].
    /// A response without a user id fails with
    /// [`ClientError::Protocol`](crate::ClientError::Protocol) before
    /// initialization is attempted. On success the session is already
    /// persisted.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserId> {
        let result = self.run(email, password).await;
        match &result {
            Ok(user_id) => {
                self.state.send_replace(LoginState::Complete);
                tracing::info!(%user_id, "Login complete");
            }
            Err(e) => {
                self.state.send_replace(LoginState::Failed);
                tracing::warn!(error = %e, "Login failed");
            }
        }
        result
    }

    async fn run(&self, email: &str, password: &str) -> ClientResult<UserId> {
        self.state.send_replace(LoginState::SigningIn);
        let response = self
            .retry
            .execute(|| self.auth.sign_in(email, password))
            .await?;
        let user_id = response.user_id()?;

        self.state.send_replace(LoginState::Initializing);
        self.initializer.ensure_initialized(user_id).await?;

        Ok(user_id)
    }
}
