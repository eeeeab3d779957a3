//! Identity provider seam
//!
//! The session manager only talks to the provider through these traits. The
//! provider owns its own protocol, handshake and token storage.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use zeronet_core::{AuthError, AuthSettings, LoginError, UserProfile};

/// Options for one interactive login
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopupOptions {
    /// Bound on the whole attempt; the manager's default applies when unset
    pub timeout: Option<Duration>,
    /// OIDC `prompt` value, e.g. `login` to force re-authentication
    pub prompt: Option<String>,
    /// Pre-fills the provider's login form
    pub login_hint: Option<String>,
}

/// An established session with the identity provider
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Run the provider's interactive login and wait for it to finish
    async fn login_with_popup(&self, options: &PopupOptions) -> Result<(), LoginError>;

    /// Profile of the logged-in user
    async fn get_user(&self) -> Result<UserProfile, LoginError>;

    /// Access token for `audience` without further user interaction
    async fn get_token_silently(&self, audience: &str) -> Result<String, LoginError>;

    /// End the provider session
    async fn logout(&self) -> Result<(), AuthError>;
}

/// Factory for [`IdentityClient`]s
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Perform whatever handshake the provider needs and return a client
    async fn connect(&self, settings: &AuthSettings) -> Result<Arc<dyn IdentityClient>, AuthError>;
}
