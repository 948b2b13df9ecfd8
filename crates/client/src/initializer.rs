//! Guarantees the server-side records (profile, streak) a new account
//! needs before the rest of the app can use it.
//!
//! `initialize_new_user` is idempotent, so this runs after every sign-in
//! and sign-up rather than tracking which accounts were already set up.

use std::sync::Arc;
use std::time::Duration;

use journal_core::initialization::{
    InitializationResult, INITIALIZE_USER_PARAM, INITIALIZE_USER_RPC,
};
use journal_core::types::UserId;

use crate::error::{ClientError, ClientResult, InitFailure};
use crate::rpc::RpcApi;

/// How long initialization may take before the user is told to retry.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UserInitializer {
    rpc: Arc<dyn RpcApi>,
    timeout: Duration,
}

impl UserInitializer {
    pub fn new(rpc: Arc<dyn RpcApi>) -> Self {
        Self::with_timeout(rpc, DEFAULT_INIT_TIMEOUT)
    }

    pub fn with_timeout(rpc: Arc<dyn RpcApi>, timeout: Duration) -> Self {
        Self { rpc, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `initialize_new_user` for `user_id` and require it to succeed.
    ///
    /// The call is abandoned when the timeout elapses; its future is
    /// dropped, so a late answer has no effect. Timeouts are reported as
    /// [`ClientError::Timeout`], every other failure as
    /// [`ClientError::Initialization`].
    pub async fn ensure_initialized(&self, user_id: UserId) -> ClientResult<()> {
        let params = serde_json::json!({ INITIALIZE_USER_PARAM: user_id });
        let call = self.rpc.call(INITIALIZE_USER_RPC, params);

        let body = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                tracing::error!(%user_id, error = %e, "Initialization call failed");
                return Err(ClientError::Initialization(InitFailure::Transport(
                    e.to_string(),
                )));
            }
            Err(_) => {
                tracing::warn!(
                    %user_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Initialization timed out",
                );
                return Err(ClientError::Timeout(self.timeout));
            }
        };

        let result = InitializationResult::parse(&body).map_err(|e| {
            tracing::error!(%user_id, error = %e, "Unusable initialization response");
            ClientError::Initialization(e.into())
        })?;

        if !result.success {
            let reason = result.error_message().to_string();
            tracing::error!(%user_id, reason = %reason, "Initialization reported failure");
            return Err(ClientError::Initialization(InitFailure::Business(reason)));
        }

        tracing::info!(
            %user_id,
            message = result.message.as_deref().unwrap_or_default(),
            "User initialized",
        );
        Ok(())
    }
}
