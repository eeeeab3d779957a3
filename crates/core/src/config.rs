//! Environment-sourced settings

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Controller used when `ZERONET_CONTROLLER_URL` is unset
pub const DEFAULT_CONTROLLER_URL: &str = "http://localhost:8080";
/// Upper bound for one interactive login attempt
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;
/// Timeout applied to controller requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Identity provider settings, read from the `AUTH_*` variables.
///
/// Every field is required and has no default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Provider domain or issuer URL (`AUTH_BASE_URL`)
    #[serde(rename = "base_url")]
    pub domain: String,
    /// OAuth client id (`AUTH_CLIENT_ID`)
    pub client_id: String,
    /// Redirect URI registered with the provider (`AUTH_CALLBACK_URL`)
    #[serde(rename = "callback_url")]
    pub redirect_uri: String,
    /// API audience requested at login (`AUTH_AUDIENCE`)
    pub audience: String,
}

impl AuthSettings {
    /// Load settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is missing
    pub fn from_env() -> AuthResult<Self> {
        Self::load(None)
    }

    /// Load settings from an explicit variable map (`AUTH_BASE_URL` => ...)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is missing
    pub fn from_vars(vars: HashMap<String, String>) -> AuthResult<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> AuthResult<Self> {
        let source = ::config::Environment::with_prefix("AUTH")
            .source(vars.map(|vars| vars.into_iter().collect()));

        let settings = ::config::Config::builder().add_source(source).build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Check that no required field is empty
    ///
    /// # Errors
    ///
    /// Names the first empty variable
    pub fn validate(&self) -> AuthResult<()> {
        let fields = [
            ("AUTH_BASE_URL", &self.domain),
            ("AUTH_CLIENT_ID", &self.client_id),
            ("AUTH_CALLBACK_URL", &self.redirect_uri),
            ("AUTH_AUDIENCE", &self.audience),
        ];

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(AuthError::configuration(format!("{name} must not be empty"))),
            None => Ok(()),
        }
    }
}

/// Console settings, read from the `ZERONET_*` variables
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Base URL of the zeronet controller API
    pub controller_url: String,
    /// Seconds before an unfinished login is abandoned
    pub login_timeout_secs: u64,
    /// Seconds before a controller request fails
    pub request_timeout_secs: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            controller_url: DEFAULT_CONTROLLER_URL.to_string(),
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ConsoleSettings {
    /// Load settings with defaults and environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed
    pub fn from_env() -> AuthResult<Self> {
        Self::load(None)
    }

    /// Load settings from an explicit variable map
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed
    pub fn from_vars(vars: HashMap<String, String>) -> AuthResult<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> AuthResult<Self> {
        let defaults = Self::default();

        let source = ::config::Environment::with_prefix("ZERONET")
            .try_parsing(true)
            .source(vars.map(|vars| vars.into_iter().collect()));

        let settings = ::config::Config::builder()
            .set_default("controller_url", defaults.controller_url)?
            .set_default("login_timeout_secs", defaults.login_timeout_secs)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .add_source(source)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub const fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
