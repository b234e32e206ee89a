use std::{env, fmt, time::Duration};

use tracing::{error, info};

use crate::error::{Error, Result};

pub const USER_VAR: &str = "CB_USER";
pub const PASSWORD_VAR: &str = "CB_PASSWORD";

pub const DEFAULT_BASE_URL: &str = "https://secure.clearbooks.co.uk";
pub const DEFAULT_ACCOUNT: &str = "springboardproltd";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Where and how to reach ClearBooks.
#[derive(Clone, Debug)]
pub struct ClearBooksConfig {
    pub base_url: String,
    /// Company slug that prefixes every accounting URL.
    pub account: String,
    /// Applied to every request, login included.
    pub timeout: Duration,
}

impl Default for ClearBooksConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClearBooksConfig {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn login_url(&self) -> String {
        format!("{}/account/action/login/", self.base_url.trim_end_matches('/'))
    }

    pub fn timesheet_url(&self) -> String {
        format!(
            "{}/{}/accounting/timetracking/view/",
            self.base_url.trim_end_matches('/'),
            self.account
        )
    }
}

/// Login form credentials. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read both credentials from `CB_USER` and `CB_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Prefer explicit values, falling back to the environment for any that
    /// are missing or empty.
    pub fn resolve(username: Option<String>, password: Option<String>) -> Result<Self> {
        Self::resolve_with(username, password, |name| env::var(name).ok())
    }

    pub fn resolve_with<F>(
        username: Option<String>,
        password: Option<String>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, variable: &'static str| {
            explicit
                .filter(|value| !value.is_empty())
                .or_else(|| lookup(variable).filter(|value| !value.is_empty()))
                .ok_or_else(|| {
                    error!("Cannot log in. Please set the {} environment variable", variable);
                    Error::Configuration { variable }
                })
        };

        let username = pick(username, USER_VAR)?;
        let password = pick(password, PASSWORD_VAR)?;

        info!("Resolved ClearBooks credentials for {}", username);
        Ok(Self { username, password })
    }
}
