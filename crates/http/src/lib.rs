//! zeronet console HTTP layer
//!
//! Interactive login against an OAuth2/OIDC identity provider, the session
//! manager that records its outcome, and the controller API client that uses
//! the resulting bearer token.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod services;
pub mod types;

pub use client::{ControllerClient, error::ClientError};
pub use services::auth::{AuthSessionManager, ClientHandle, LoginOutcome, TOKEN_AUDIENCE};
pub use services::identity::{IdentityClient, IdentityProvider, PopupOptions};
pub use services::oauth::{OAuthProvider, SystemBrowser, UrlOpener};
pub use types::{Peer, PeersPage, Redirect};
