//! Account settings: password change and reset, data export, deletion.
//!
//! Destructive or credential-changing operations re-authenticate with the
//! password the user just typed before touching anything remote.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use journal_core::account::{
    export_file_name, validate_reset_email, ChangePasswordRequest, DeleteAccountRequest,
    DeleteAccountResponse, ExportDataResponse, DELETE_ACCOUNT_RPC, EXPORT_ENTRIES_RPC,
};
use journal_core::session::Session;

use crate::auth::AuthApi;
use crate::error::{ClientError, ClientResult};
use crate::retry::RetryPolicy;
use crate::rpc::RpcApi;
use crate::session_manager::SessionManager;

pub struct AccountService {
    auth: Arc<dyn AuthApi>,
    rpc: Arc<dyn RpcApi>,
    sessions: Arc<SessionManager>,
    retry: RetryPolicy,
}

impl AccountService {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        rpc: Arc<dyn RpcApi>,
        sessions: Arc<SessionManager>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            auth,
            rpc,
            sessions,
            retry,
        }
    }

    /// Change the signed-in user's password after confirming the current one.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()> {
        request.validate()?;
        let session = self.sessions.valid_session().await?;

        self.reauthenticate(&session, &request.current_password).await?;
        self.auth.update_password(&request.new_password).await?;

        tracing::info!(user_id = %session.user_id, "Password changed");
        Ok(())
    }

    /// Email a password reset link. Works signed out.
    pub async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        validate_reset_email(email)?;
        let email = email.trim();
        self.retry
            .execute(|| self.auth.request_password_reset(email))
            .await
    }

    /// Fetch every entry of the signed-in user in export form.
    pub async fn export_data(&self) -> ClientResult<ExportDataResponse> {
        let session = self.sessions.valid_session().await?;

        let body = self
            .rpc
            .call(EXPORT_ENTRIES_RPC, serde_json::json!({}))
            .await?;
        let export: ExportDataResponse = serde_json::from_str(&body)?;

        tracing::info!(
            user_id = %session.user_id,
            total_entries = export.total_entries,
            "Journal exported",
        );
        Ok(export)
    }

    /// Write `export` as pretty JSON into `dir` under its dated file name.
    pub async fn write_export(export: &ExportDataResponse, dir: &Path) -> ClientResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(export_file_name(export.exported_at));
        tokio::fs::write(&path, serde_json::to_vec_pretty(export)?).await?;
        Ok(path)
    }

    /// Permanently delete the account and everything in it, then sign out.
    pub async fn delete_account(&self, request: &DeleteAccountRequest) -> ClientResult<()> {
        request.validate()?;
        let session = self.sessions.valid_session().await?;

        self.reauthenticate(&session, &request.password).await?;

        let body = self
            .rpc
            .call(DELETE_ACCOUNT_RPC, serde_json::json!({}))
            .await?;
        let response: DeleteAccountResponse = serde_json::from_str(&body)?;
        if !response.success {
            let reason = if response.message.is_empty() {
                "account deletion failed".to_string()
            } else {
                response.message
            };
            tracing::error!(user_id = %session.user_id, reason = %reason, "Account deletion refused");
            return Err(ClientError::Rejected(reason));
        }

        // The account is gone, so the session is useless whatever the
        // remote sign-out says.
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(user_id = %session.user_id, error = %e, "Sign-out after deletion failed");
        }
        self.sessions.store().destroy();

        tracing::info!(user_id = %session.user_id, "Account deleted");
        Ok(())
    }

    async fn reauthenticate(&self, session: &Session, password: &str) -> ClientResult<()> {
        let email = session
            .email
            .as_deref()
            .ok_or_else(|| ClientError::Protocol("session carries no email".into()))?;

        self.retry
            .execute(|| self.auth.sign_in(email, password))
            .await?;
        Ok(())
    }
}
