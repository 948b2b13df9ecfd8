//! The authenticated-user credential bundle held on the client.
//!
//! A [`Session`] is created by a successful sign-in or sign-up, replaced
//! wholesale on token refresh, and discarded on sign-out or when the
//! backend reports its tokens as revoked.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Timestamp, UserId};

/// Access/refresh token pair plus the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    /// When the access token stops being accepted by the backend.
    pub expires_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    /// Build a session from the token fields of an auth response.
    ///
    /// `expires_at` (absolute, Unix seconds) wins over `expires_in`
    /// (relative, seconds). With neither present the token is assumed to
    /// be valid for one hour, which matches the backend default.
    pub fn from_tokens(
        access_token: String,
        refresh_token: String,
        user_id: UserId,
        expires_at: Option<i64>,
        expires_in: Option<i64>,
    ) -> Result<Self, CoreError> {
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(CoreError::Validation(
                "Session requires both an access and a refresh token".into(),
            ));
        }

        let expires_at = match (expires_at, expires_in) {
            (Some(at), _) => chrono::DateTime::from_timestamp(at, 0).ok_or_else(|| {
                CoreError::Malformed(format!("expires_at {at} is out of range"))
            })?,
            (None, Some(secs)) => Utc::now() + Duration::seconds(secs),
            (None, None) => Utc::now() + Duration::hours(1),
        };

        Ok(Self {
            access_token,
            refresh_token,
            user_id,
            expires_at,
            email: None,
        })
    }

    /// Attach the account email reported by the backend.
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// True when the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: Timestamp, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .map_or(true, |refresh_at| refresh_at <= now)
    }

    /// Serialize to the JSON document kept in durable storage.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Malformed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Malformed(e.to_string()))
    }
}
