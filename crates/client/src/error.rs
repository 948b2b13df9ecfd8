use std::time::Duration;

use journal_core::error::CoreError;
use journal_core::error_mapper::{
    map_login_error, map_registration_error, LOGIN_CONNECTION_PROBLEM, LOGIN_GENERIC_FAILURE,
    REGISTRATION_GENERIC_FAILURE,
};
use journal_core::initialization::InitializationBodyError;

use crate::retry::RateLimited;

/// Shown when account initialization does not finish in time.
pub const INITIALIZATION_TIMEOUT_MESSAGE: &str =
    "Przygotowanie konta trwa dłużej niż oczekiwano. Sprawdź połączenie z internetem i spróbuj ponownie.";

/// Shown when an operation needs a session and there is none.
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Sesja wygasła. Zaloguj się ponownie.";

/// Shown for failures the user cannot do anything specific about.
pub const GENERIC_FAILURE_MESSAGE: &str = "Coś poszło nie tak. Spróbuj ponownie później.";

/// Shown when the backend refuses to delete the account.
pub const ACCOUNT_DELETION_FAILED_MESSAGE: &str =
    "Nie udało się usunąć konta. Spróbuj ponownie później.";

/// Error code the backend attaches to throttled requests.
const RATE_LIMIT_CODE: &str = "over_request_rate_limit";

// ---------------------------------------------------------------------------
// AuthError
// ---------------------------------------------------------------------------

/// A failure classified by the remote auth API (bad credentials, weak
/// password, duplicate email, throttling, revoked token).
///
/// `message` is the raw remote text; it is what the error mapper matches
/// against and must never be shown to the user directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    /// HTTP status of the failed call, when there was one.
    pub status: Option<u16>,
    /// Machine-readable code such as `invalid_credentials`.
    pub error_code: Option<String>,
    pub message: String,
}

impl AuthError {
    pub fn new(status: Option<u16>, error_code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
        }
    }

    /// The backend is throttling this client.
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
            || self
                .error_code
                .as_deref()
                .is_some_and(|code| code.contains(RATE_LIMIT_CODE))
            || self.message.contains(RATE_LIMIT_CODE)
            || self.message.contains("429")
    }

    /// The tokens this error was reported for are revoked or unknown.
    pub fn is_session_invalid(&self) -> bool {
        if self.is_rate_limited() {
            return false;
        }
        let code = self.error_code.as_deref().unwrap_or_default();
        matches!(self.status, Some(400 | 401 | 403))
            || code.contains("refresh_token_not_found")
            || code.contains("session_not_found")
            || self.message.to_lowercase().contains("invalid refresh token")
    }
}

// ---------------------------------------------------------------------------
// InitFailure
// ---------------------------------------------------------------------------

/// Why `initialize_new_user` did not confirm the account.
///
/// All three kinds reach callers as [`ClientError::Initialization`]; the
/// user cannot act differently on any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitFailure {
    /// The procedure answered with an empty or malformed body.
    #[error("{0}")]
    Protocol(#[from] InitializationBodyError),

    /// The procedure ran and reported `success: false`.
    #[error("{0}")]
    Business(String),

    /// The call itself failed before a body was received.
    #[error("{0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Error type for every remote-facing operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The remote API violated its response contract (e.g. a sign-in
    /// that returned no user id).
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("initialization failed: {0}")]
    Initialization(InitFailure),

    /// Initialization did not finish within the allotted window.
    #[error("{}", INITIALIZATION_TIMEOUT_MESSAGE)]
    Timeout(Duration),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The data API returned a non-2xx status code.
    #[error("Remote API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound {
        entity: &'static str,
        id: uuid::Uuid,
    },

    /// A procedure ran but refused the operation. Carries the raw remote
    /// reason, which is logged and never shown.
    #[error("Operation rejected: {0}")]
    Rejected(String),

    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Message to show after a failed login attempt.
    pub fn login_message(&self) -> String {
        match self {
            ClientError::Auth(err) => map_login_error(&err.message).to_string(),
            ClientError::Timeout(_) => INITIALIZATION_TIMEOUT_MESSAGE.to_string(),
            ClientError::Request(_) => LOGIN_CONNECTION_PROBLEM.to_string(),
            ClientError::Core(CoreError::Validation(msg)) => msg.clone(),
            other => {
                tracing::error!(error = %other, "Login failed");
                LOGIN_GENERIC_FAILURE.to_string()
            }
        }
    }

    /// Message to show after any other failed operation.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Auth(err) => map_login_error(&err.message).to_string(),
            ClientError::Timeout(_) => INITIALIZATION_TIMEOUT_MESSAGE.to_string(),
            ClientError::Request(_) => LOGIN_CONNECTION_PROBLEM.to_string(),
            ClientError::Core(CoreError::Validation(msg)) => msg.clone(),
            ClientError::NotAuthenticated => NOT_AUTHENTICATED_MESSAGE.to_string(),
            ClientError::NotFound { .. } => "Nie znaleziono wpisu.".to_string(),
            ClientError::Rejected(reason) => {
                tracing::warn!(reason = %reason, "Operation rejected by backend");
                ACCOUNT_DELETION_FAILED_MESSAGE.to_string()
            }
            other => {
                tracing::error!(error = %other, "Operation failed");
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Message to show after a failed registration attempt.
    pub fn registration_message(&self) -> String {
        match self {
            ClientError::Auth(err) => map_registration_error(&err.message).to_string(),
            ClientError::Timeout(_) => INITIALIZATION_TIMEOUT_MESSAGE.to_string(),
            ClientError::Core(CoreError::Validation(msg)) => msg.clone(),
            other => {
                tracing::error!(error = %other, "Registration failed");
                REGISTRATION_GENERIC_FAILURE.to_string()
            }
        }
    }
}

impl RateLimited for AuthError {
    fn is_rate_limited(&self) -> bool {
        AuthError::is_rate_limited(self)
    }
}

impl RateLimited for ClientError {
    fn is_rate_limited(&self) -> bool {
        match self {
            ClientError::Auth(err) => err.is_rate_limited(),
            ClientError::Api { status, code, .. } => {
                *status == 429 || code.as_deref().is_some_and(|c| c.contains(RATE_LIMIT_CODE))
            }
            _ => false,
        }
    }
}
