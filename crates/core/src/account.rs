//! Account lifecycle commands: password change, data export, account
//! deletion and password reset.
//!
//! The command structs are validated here before any remote call is
//! made. Export and deletion responses mirror the JSON returned by the
//! `export_journal_entries` and `delete_my_account` procedures.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntryId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const EXPORT_ENTRIES_RPC: &str = "export_journal_entries";
pub const DELETE_ACCOUNT_RPC: &str = "delete_my_account";

/// Phrase the user must type to confirm account deletion.
pub const DELETE_CONFIRMATION_PHRASE: &str = "delete my data";

/// Minimum password length accepted on sign-up and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Upper bound on an email address accepted for password reset.
pub const MAX_EMAIL_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.current_password.is_empty() {
            return Err(CoreError::Validation("Obecne hasło jest wymagane.".into()));
        }
        validate_new_password(&self.new_password, &self.confirm_password)
    }
}

/// Validate a new password and its confirmation.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Hasło musi mieć co najmniej {MIN_PASSWORD_LENGTH} znaków."
        )));
    }
    if password != confirmation {
        return Err(CoreError::Validation("Hasła muszą być identyczne.".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Password reset
// ---------------------------------------------------------------------------

/// Minimal shape check for the address a reset link is sent to.
///
/// Full address validation is left to the backend.
pub fn validate_reset_email(email: &str) -> Result<(), CoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CoreError::Validation("Adres e-mail jest wymagany".into()));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(CoreError::Validation("Adres e-mail jest za długi".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(CoreError::Validation("Podaj prawidłowy adres e-mail".into())),
    }
}

// ---------------------------------------------------------------------------
// Account deletion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeleteAccountRequest {
    /// Re-entered to prove the user is present before data is destroyed.
    pub password: String,
    pub confirmation_phrase: String,
}

impl DeleteAccountRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.password.is_empty() {
            return Err(CoreError::Validation("Hasło jest wymagane.".into()));
        }
        if self.confirmation_phrase != DELETE_CONFIRMATION_PHRASE {
            return Err(CoreError::Validation(format!(
                "Aby potwierdzić, wpisz dokładnie: {DELETE_CONFIRMATION_PHRASE}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDataResponse {
    pub total_entries: i64,
    pub exported_at: Timestamp,
    #[serde(default)]
    pub entries: Vec<ExportedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub id: EntryId,
    pub created_at: Timestamp,
    pub content: String,
}

/// File name offered for a downloaded export, e.g.
/// `10xjournal-export-2025-01-31.json`.
pub fn export_file_name(exported_at: Timestamp) -> String {
    format!("10xjournal-export-{}.json", exported_at.format("%Y-%m-%d"))
}
