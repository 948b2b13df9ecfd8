//! Result envelope of the `initialize_new_user` procedure.
//!
//! The procedure guarantees that a profile row and a streak row exist for
//! a user. It answers with a small JSON object whose field names are
//! matched case-insensitively.

use serde::Deserialize;

use crate::types::UserId;

/// Name of the idempotent initialization procedure.
pub const INITIALIZE_USER_RPC: &str = "initialize_new_user";

/// Parameter name the procedure expects for the user id.
pub const INITIALIZE_USER_PARAM: &str = "p_user_id";

/// Reported when a failed result does not say why.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitializationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Why a response body could not be turned into an [`InitializationResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitializationBodyError {
    #[error("empty response from database")]
    Empty,

    #[error("invalid response format")]
    InvalidFormat,
}

impl InitializationResult {
    /// Parse a raw response body.
    ///
    /// Object keys are lower-cased before decoding so `"Success"` and
    /// `"USER_ID"` are accepted. A blank body is [`Empty`]; anything that
    /// is not a JSON object of the expected shape is [`InvalidFormat`].
    ///
    /// [`Empty`]: InitializationBodyError::Empty
    /// [`InvalidFormat`]: InitializationBodyError::InvalidFormat
    pub fn parse(body: &str) -> Result<Self, InitializationBodyError> {
        if body.trim().is_empty() {
            return Err(InitializationBodyError::Empty);
        }

        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|_| InitializationBodyError::InvalidFormat)?;

        let serde_json::Value::Object(fields) = value else {
            return Err(InitializationBodyError::InvalidFormat);
        };

        let normalized: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        serde_json::from_value(serde_json::Value::Object(normalized))
            .map_err(|_| InitializationBodyError::InvalidFormat)
    }

    /// The failure reason, falling back to [`UNKNOWN_ERROR`].
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or(UNKNOWN_ERROR)
    }
}
