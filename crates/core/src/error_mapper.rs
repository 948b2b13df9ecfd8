//! Translation of raw auth error text into user-facing messages.
//!
//! The backend reports auth failures as free-form English strings. Both
//! entry points classify a message by case-insensitive substring match
//! against a priority-ordered rule list (first match wins) and always
//! produce one of a fixed set of messages. The raw remote text is never
//! shown to the user; unmatched messages are logged for diagnosis.

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

pub const LOGIN_INVALID_CREDENTIALS: &str = "Nieprawidłowy e-mail lub hasło.";
pub const LOGIN_EMAIL_NOT_CONFIRMED: &str =
    "Potwierdź adres e-mail, zanim spróbujesz się zalogować.";
pub const LOGIN_RATE_LIMITED: &str = "Zbyt wiele prób logowania. Spróbuj ponownie za kilka minut.";
pub const LOGIN_CONNECTION_PROBLEM: &str =
    "Problem z połączeniem. Sprawdź internet i spróbuj ponownie.";
pub const LOGIN_GENERIC_FAILURE: &str = "Nie udało się zalogować. Spróbuj ponownie później.";

/// Category of a failed sign-in, in rule priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidCredentials,
    EmailNotConfirmed,
    RateLimited,
    ConnectionProblem,
    Unknown,
}

const LOGIN_RULES: &[(&[&str], LoginFailure)] = &[
    (
        &["invalid login credentials", "invalid login"],
        LoginFailure::InvalidCredentials,
    ),
    (
        &[
            "email not confirmed",
            "confirm your email",
            "verify your email",
            "unverified",
        ],
        LoginFailure::EmailNotConfirmed,
    ),
    (&["rate limit", "too many"], LoginFailure::RateLimited),
    (
        &["timeout", "network", "connection"],
        LoginFailure::ConnectionProblem,
    ),
];

impl LoginFailure {
    /// Classify a raw remote message.
    pub fn classify(raw: &str) -> Self {
        let message = raw.to_lowercase();
        LOGIN_RULES
            .iter()
            .find(|(patterns, _)| patterns.iter().any(|p| message.contains(p)))
            .map(|(_, failure)| *failure)
            .unwrap_or(LoginFailure::Unknown)
    }

    pub fn message(self) -> &'static str {
        match self {
            LoginFailure::InvalidCredentials => LOGIN_INVALID_CREDENTIALS,
            LoginFailure::EmailNotConfirmed => LOGIN_EMAIL_NOT_CONFIRMED,
            LoginFailure::RateLimited => LOGIN_RATE_LIMITED,
            LoginFailure::ConnectionProblem => LOGIN_CONNECTION_PROBLEM,
            LoginFailure::Unknown => LOGIN_GENERIC_FAILURE,
        }
    }
}

/// Map a raw sign-in error message to the message shown to the user.
pub fn map_login_error(raw: &str) -> &'static str {
    let failure = LoginFailure::classify(raw);
    if failure == LoginFailure::Unknown {
        tracing::warn!(message = raw, "Unmapped login error");
    }
    failure.message()
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

pub const REGISTRATION_USER_EXISTS: &str = "Użytkownik o tym adresie e-mail już istnieje.";
pub const REGISTRATION_WEAK_PASSWORD: &str = "Podane hasło jest zbyt słabe.";
pub const REGISTRATION_RATE_LIMITED: &str =
    "Osiągnięto limit rejestracji. Spróbuj ponownie za kilka minut.";
pub const REGISTRATION_GENERIC_FAILURE: &str =
    "Nie udało się utworzyć konta. Sprawdź dane i spróbuj ponownie.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationFailure {
    UserExists,
    WeakPassword,
    RateLimited,
    Unknown,
}

impl RegistrationFailure {
    /// Classify a raw remote message.
    ///
    /// The weak-password rule needs both words: a message that mentions
    /// the password without calling it weak falls through.
    pub fn classify(raw: &str) -> Self {
        let message = raw.to_lowercase();

        if message.contains("already registered") || message.contains("already exists") {
            RegistrationFailure::UserExists
        } else if message.contains("password") && message.contains("weak") {
            RegistrationFailure::WeakPassword
        } else if message.contains("email rate limit") {
            RegistrationFailure::RateLimited
        } else {
            RegistrationFailure::Unknown
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RegistrationFailure::UserExists => REGISTRATION_USER_EXISTS,
            RegistrationFailure::WeakPassword => REGISTRATION_WEAK_PASSWORD,
            RegistrationFailure::RateLimited => REGISTRATION_RATE_LIMITED,
            RegistrationFailure::Unknown => REGISTRATION_GENERIC_FAILURE,
        }
    }
}

/// Map a raw sign-up error message to the message shown to the user.
pub fn map_registration_error(raw: &str) -> &'static str {
    let failure = RegistrationFailure::classify(raw);
    if failure == RegistrationFailure::Unknown {
        tracing::warn!(message = raw, "Unmapped registration error");
    }
    failure.message()
}
