//! Authentication error types shared across crates

use serde::{Deserialize, Serialize};

/// Standard result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Failure of a single interactive login attempt.
///
/// Cloneable so the last failure can live in the session's error cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum LoginError {
    #[error("Popup login failed: {message}")]
    Popup { message: String },

    #[error("Login callback rejected: {message}")]
    Callback { message: String },

    #[error("Failed to fetch user profile: {message}")]
    Profile { message: String },

    #[error("Failed to fetch access token: {message}")]
    Token { message: String },

    #[error("Login cancelled")]
    Cancelled,

    #[error("Login timed out after {seconds} seconds")]
    TimedOut { seconds: u64 },
}

impl LoginError {
    /// Create a popup error
    pub fn popup(message: impl Into<String>) -> Self {
        Self::Popup {
            message: message.into(),
        }
    }

    /// Create a callback error
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Create a profile error
    pub fn profile(message: impl Into<String>) -> Self {
        Self::Profile {
            message: message.into(),
        }
    }

    /// Create a token error
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token {
            message: message.into(),
        }
    }
}

/// Errors surfaced by client creation and provider calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Identity provider error: {message}")]
    Provider { message: String },

    #[error(transparent)]
    Login(#[from] LoginError),
}

impl AuthError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Returns `true` for missing or invalid settings
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<::config::ConfigError> for AuthError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_error_messages() {
        assert_eq!(
            LoginError::TimedOut { seconds: 120 }.to_string(),
            "Login timed out after 120 seconds"
        );
        assert_eq!(
            LoginError::popup("access_denied").to_string(),
            "Popup login failed: access_denied"
        );
    }

    #[test]
    fn login_error_is_transparent_inside_auth_error() {
        let err: AuthError = LoginError::Cancelled.into();
        assert_eq!(err.to_string(), "Login cancelled");
        assert!(!err.is_configuration());
        assert!(AuthError::configuration("missing").is_configuration());
    }
}
