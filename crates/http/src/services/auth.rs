//! Auth session manager for coordinating login and logout

use super::identity::{IdentityClient, IdentityProvider, PopupOptions};
use crate::types::Redirect;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zeronet_core::config::DEFAULT_LOGIN_TIMEOUT_SECS;
use zeronet_core::{
    AuthError, AuthSettings, LoginError, SessionStore, SessionView, StoreCell, UserProfile,
};

/// Audience every access token is requested for
pub const TOKEN_AUDIENCE: &str = "zeronet";

/// Bound on a login attempt when neither the caller nor the manager sets one
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS);

/// Opaque handle to a connected identity client
pub struct ClientHandle {
    client: Arc<dyn IdentityClient>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle").finish_non_exhaustive()
    }
}

/// How a login attempt ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Profile and token are in the session store
    Authenticated,
    /// The error cell holds the reason
    Failed,
    /// Another attempt was already running; the store was not touched
    Rejected,
}

/// Drives the identity provider and records results in the session store
pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
    login_timeout: Duration,
    in_flight: AtomicBool,
}

impl AuthSessionManager {
    /// Create a manager that records sessions in `store`
    pub fn new(provider: Arc<dyn IdentityProvider>, store: SessionStore) -> Self {
        Self {
            provider,
            store,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Default bound for attempts whose options carry no timeout
    #[must_use]
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// The store this manager writes
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Read-only view for consumers such as the controller client
    pub fn session(&self) -> SessionView {
        self.store.view()
    }

    /// Validate `settings` and connect to the identity provider
    pub async fn create_client(&self, settings: &AuthSettings) -> Result<ClientHandle, AuthError> {
        settings.validate()?;

        let client = self.provider.connect(settings).await?;
        debug!(domain = %settings.domain, client_id = %settings.client_id, "Identity client created");

        Ok(ClientHandle { client })
    }

    /// Run one interactive login and record the outcome.
    ///
    /// Errors never escape; they land in the session's error cell.
    pub async fn login_with_popup(
        &self,
        client: &ClientHandle,
        options: PopupOptions,
        cancel: &CancellationToken,
    ) -> LoginOutcome {
        let Some(_guard) = LoginGuard::acquire(&self.in_flight, self.store.popup_open()) else {
            warn!("Login already in progress, rejecting concurrent attempt");
            return LoginOutcome::Rejected;
        };

        self.store.popup_open().set(true);
        self.store.error().set(None);
        info!("Starting popup login");

        let timeout = options.timeout.unwrap_or(self.login_timeout);
        let result = tokio::select! {
            () = cancel.cancelled() => Err(LoginError::Cancelled),
            attempt = tokio::time::timeout(timeout, authenticate(client.client.as_ref(), &options)) => {
                attempt.unwrap_or(Err(LoginError::TimedOut {
                    seconds: timeout.as_secs(),
                }))
            }
        };

        match result {
            Ok((user, token)) => {
                self.store.user().set(user);
                self.store.authenticated().set(true);
                self.store.token().set(Some(token));
                info!("Login succeeded");
                LoginOutcome::Authenticated
            }
            Err(err) => {
                error!(error = %err, "Login failed");
                self.store.authenticated().set(false);
                self.store.token().set(None);
                self.store.user().set(UserProfile::new());
                self.store.error().set(Some(err));
                LoginOutcome::Failed
            }
        }
    }

    /// End the provider session and clear the store
    pub async fn logout(&self, client: &ClientHandle) -> Redirect {
        if let Err(err) = client.client.logout().await {
            warn!(error = %err, "Provider logout failed");
        }

        self.store.authenticated().set(false);
        self.store.user().set(UserProfile::new());
        self.store.token().set(None);
        self.store.error().set(None);
        info!("Logged out");

        Redirect::temporary("/")
    }
}

impl std::fmt::Debug for AuthSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionManager")
            .field("store", &self.store)
            .field("login_timeout", &self.login_timeout)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

/// Popup login, then profile, then token. Nothing is committed here.
async fn authenticate(
    client: &dyn IdentityClient,
    options: &PopupOptions,
) -> Result<(UserProfile, String), LoginError> {
    client.login_with_popup(options).await?;

    let user = client.get_user().await?;
    if user.is_empty() {
        return Err(LoginError::profile("provider returned an empty profile"));
    }

    let token = client.get_token_silently(TOKEN_AUDIENCE).await?;
    if token.is_empty() {
        return Err(LoginError::token("provider returned an empty token"));
    }

    Ok((user, token))
}

/// Held for the lifetime of one attempt; resets `popup_open` on drop
struct LoginGuard<'a> {
    in_flight: &'a AtomicBool,
    popup_open: &'a StoreCell<bool>,
}

impl<'a> LoginGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool, popup_open: &'a StoreCell<bool>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                in_flight,
                popup_open,
            })
    }
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        self.popup_open.set(false);
        self.in_flight.store(false, Ordering::Release);
    }
}
