//! Service layer for login and session management

pub mod auth;
pub mod callback;
pub mod identity;
pub mod oauth;
pub mod pkce;

pub use auth::{AuthSessionManager, ClientHandle, LoginOutcome};
pub use identity::{IdentityClient, IdentityProvider, PopupOptions};
pub use oauth::{OAuthProvider, ProviderMetadata, SystemBrowser, UrlOpener};
