use std::path::PathBuf;
use std::time::Duration;

use journal_core::types::UserId;

use crate::retry::RetryPolicy;

/// Configuration problems detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Development-only identity used when nobody is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevUserConfig {
    pub enabled: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl DevUserConfig {
    /// The override id, when enabled and parseable.
    pub fn parsed_user_id(&self) -> Option<UserId> {
        if !self.enabled {
            return None;
        }
        self.user_id.as_deref().and_then(|id| id.trim().parse().ok())
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub supabase_url: String,
    /// Public anon key sent with every request.
    pub anon_key: String,
    /// Where the session file lives (default: `.journal`).
    pub data_dir: PathBuf,
    /// Per-request HTTP timeout (default: 30s).
    pub request_timeout: Duration,
    /// Budget for account initialization (default: 30s).
    pub init_timeout: Duration,
    pub retry: RetryPolicy,
    /// Refresh the access token when it has less than this left (default: 60s).
    pub refresh_margin: Duration,
    pub dev_user: DevUserConfig,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default     |
    /// |-------------------------------|-------------|
    /// | `SUPABASE_URL`                | (required)  |
    /// | `SUPABASE_ANON_KEY`           | (required)  |
    /// | `JOURNAL_DATA_DIR`            | `.journal`  |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`        |
    /// | `INIT_TIMEOUT_SECS`           | `30`        |
    /// | `RETRY_MAX_ATTEMPTS`          | `3`         |
    /// | `RETRY_BASE_DELAY_MS`         | `500`       |
    /// | `SESSION_REFRESH_MARGIN_SECS` | `60`        |
    /// | `DEV_USER_ENABLED`            | `false`     |
    /// | `DEV_USER_ID`                 | unset       |
    /// | `DEV_USER_EMAIL`              | unset       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let supabase_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "SUPABASE_URL",
                value: supabase_url,
                reason: "must start with http:// or https://".into(),
            });
        }
        let anon_key = var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let data_dir = var("JOURNAL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".journal"));

        let request_timeout = Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?);
        let init_timeout = Duration::from_secs(parse_or(&var, "INIT_TIMEOUT_SECS", 30)?);
        let retry = RetryPolicy::new(
            parse_or(&var, "RETRY_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(parse_or(&var, "RETRY_BASE_DELAY_MS", 500)?),
        );
        let refresh_margin =
            Duration::from_secs(parse_or(&var, "SESSION_REFRESH_MARGIN_SECS", 60)?);

        let dev_user = DevUserConfig {
            enabled: parse_or(&var, "DEV_USER_ENABLED", false)?,
            user_id: var("DEV_USER_ID"),
            email: var("DEV_USER_EMAIL"),
        };

        Ok(Self {
            supabase_url,
            anon_key,
            data_dir,
            request_timeout,
            init_timeout,
            retry,
            refresh_margin,
            dev_user,
        })
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
            value,
        }),
    }
}
