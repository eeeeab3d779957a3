//! Integration tests for the auth session manager

use async_trait::async_trait;
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use zeronet_core::{AuthError, AuthSettings, LoginError, LoginPhase, SessionStore, UserProfile};
use zeronet_http::{
    AuthSessionManager, ClientHandle, IdentityClient, IdentityProvider, LoginOutcome,
    PopupOptions, TOKEN_AUDIENCE,
};

mock! {
    pub Client {}

    #[async_trait]
    impl IdentityClient for Client {
        async fn login_with_popup(&self, options: &PopupOptions) -> Result<(), LoginError>;
        async fn get_user(&self) -> Result<UserProfile, LoginError>;
        async fn get_token_silently(&self, audience: &str) -> Result<String, LoginError>;
        async fn logout(&self) -> Result<(), AuthError>;
    }
}

mock! {
    pub Provider {}

    #[async_trait]
    impl IdentityProvider for Provider {
        async fn connect(&self, settings: &AuthSettings) -> Result<Arc<dyn IdentityClient>, AuthError>;
    }
}

/// Blocks inside the popup step until released
#[derive(Default)]
struct GatedClient {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl IdentityClient for GatedClient {
    async fn login_with_popup(&self, _options: &PopupOptions) -> Result<(), LoginError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }

    async fn get_user(&self) -> Result<UserProfile, LoginError> {
        Ok(profile("gated@example.com"))
    }

    async fn get_token_silently(&self, _audience: &str) -> Result<String, LoginError> {
        Ok("gated-token".to_string())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

fn settings() -> AuthSettings {
    AuthSettings {
        domain: "zeronet.eu.auth0.com".to_string(),
        client_id: "abc123".to_string(),
        redirect_uri: "http://localhost:5173/callback".to_string(),
        audience: "zeronet".to_string(),
    }
}

fn profile(email: &str) -> UserProfile {
    let mut user = UserProfile::new();
    user.insert("email".to_string(), json!(email));
    user
}

async fn manager_with(client: Arc<dyn IdentityClient>) -> (AuthSessionManager, ClientHandle) {
    let mut provider = MockProvider::new();
    provider
        .expect_connect()
        .times(1)
        .returning(move |_| Ok(Arc::clone(&client)));

    let manager = AuthSessionManager::new(Arc::new(provider), SessionStore::new());
    let handle = manager.create_client(&settings()).await.unwrap();
    (manager, handle)
}

fn successful_client(email: &str, token: &str) -> MockClient {
    let mut client = MockClient::new();
    client.expect_login_with_popup().returning(|_| Ok(()));
    let user = profile(email);
    client.expect_get_user().returning(move || Ok(user.clone()));
    let token = token.to_string();
    client
        .expect_get_token_silently()
        .withf(|audience| audience == TOKEN_AUDIENCE)
        .returning(move |_| Ok(token.clone()));
    client
}

#[tokio::test]
async fn test_create_client_rejects_empty_settings_before_connecting() {
    let mut provider = MockProvider::new();
    provider.expect_connect().times(0);
    let manager = AuthSessionManager::new(Arc::new(provider), SessionStore::new());

    let mut settings = settings();
    settings.client_id = String::new();

    let err = manager.create_client(&settings).await.unwrap_err();
    assert_eq!(
        err,
        AuthError::configuration("AUTH_CLIENT_ID must not be empty")
    );
}

#[tokio::test]
async fn test_create_client_surfaces_provider_errors() {
    let mut provider = MockProvider::new();
    provider
        .expect_connect()
        .returning(|_| Err(AuthError::provider("discovery returned 404")));
    let manager = AuthSessionManager::new(Arc::new(provider), SessionStore::new());

    let err = manager.create_client(&settings()).await.unwrap_err();
    assert_eq!(err, AuthError::provider("discovery returned 404"));
}

#[tokio::test]
async fn test_successful_login_populates_store() {
    let (manager, handle) =
        manager_with(Arc::new(successful_client("ada@example.com", "T1"))).await;

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Authenticated);

    let state = manager.session().snapshot();
    assert!(state.authenticated);
    assert_eq!(state.user["email"], "ada@example.com");
    assert_eq!(state.token.as_deref(), Some("T1"));
    assert!(!state.popup_open);
    assert_eq!(state.error, None);
    assert_eq!(state.phase(), LoginPhase::Authenticated);
}

#[tokio::test]
async fn test_popup_failure_is_recorded_not_returned() {
    let mut client = MockClient::new();
    client
        .expect_login_with_popup()
        .returning(|_| Err(LoginError::popup("access_denied")));
    client.expect_get_user().times(0);
    client.expect_get_token_silently().times(0);
    let (manager, handle) = manager_with(Arc::new(client)).await;

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Failed);

    let state = manager.session().snapshot();
    assert!(!state.authenticated);
    assert!(state.user.is_empty());
    assert_eq!(state.token, None);
    assert!(!state.popup_open);
    assert_eq!(state.error, Some(LoginError::popup("access_denied")));
    assert_eq!(state.phase(), LoginPhase::Failed);
}

#[tokio::test]
async fn test_token_failure_leaves_user_empty() {
    let mut client = MockClient::new();
    client.expect_login_with_popup().returning(|_| Ok(()));
    client
        .expect_get_user()
        .returning(|| Ok(profile("ada@example.com")));
    client
        .expect_get_token_silently()
        .returning(|_| Err(LoginError::token("consent_required")));
    let (manager, handle) = manager_with(Arc::new(client)).await;

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Failed);

    let state = manager.session().snapshot();
    assert!(state.user.is_empty());
    assert!(!state.authenticated);
    assert_eq!(state.error, Some(LoginError::token("consent_required")));
}

#[tokio::test]
async fn test_empty_profile_is_a_failure() {
    let mut client = MockClient::new();
    client.expect_login_with_popup().returning(|_| Ok(()));
    client.expect_get_user().returning(|| Ok(UserProfile::new()));
    client.expect_get_token_silently().times(0);
    let (manager, handle) = manager_with(Arc::new(client)).await;

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Failed);
    assert!(matches!(
        manager.session().error(),
        Some(LoginError::Profile { .. })
    ));
}

#[tokio::test]
async fn test_new_attempt_clears_previous_error() {
    let mut client = MockClient::new();
    let mut attempts = 0;
    client.expect_login_with_popup().returning(move |_| {
        attempts += 1;
        if attempts == 1 {
            Err(LoginError::popup("popup closed"))
        } else {
            Ok(())
        }
    });
    client
        .expect_get_user()
        .returning(|| Ok(profile("ada@example.com")));
    client
        .expect_get_token_silently()
        .returning(|_| Ok("T2".to_string()));
    let (manager, handle) = manager_with(Arc::new(client)).await;
    let cancel = CancellationToken::new();

    let first = manager
        .login_with_popup(&handle, PopupOptions::default(), &cancel)
        .await;
    assert_eq!(first, LoginOutcome::Failed);
    assert!(manager.session().error().is_some());

    let second = manager
        .login_with_popup(&handle, PopupOptions::default(), &cancel)
        .await;
    assert_eq!(second, LoginOutcome::Authenticated);
    assert_eq!(manager.session().error(), None);
    assert_eq!(manager.session().token().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_popup_open_while_in_flight_and_concurrent_login_rejected() {
    let gated = Arc::new(GatedClient::default());
    let (manager, handle) = manager_with(gated.clone()).await;
    let cancel = CancellationToken::new();
    let mut popup = manager.session().subscribe_popup_open();

    let (first, second) = tokio::join!(
        manager.login_with_popup(&handle, PopupOptions::default(), &cancel),
        async {
            gated.entered.notified().await;
            assert!(manager.session().popup_open());
            assert!(*popup.borrow_and_update());

            let second = manager
                .login_with_popup(&handle, PopupOptions::default(), &cancel)
                .await;

            // The rejected call must not touch the running attempt
            assert!(manager.session().popup_open());
            gated.release.notify_one();
            second
        }
    );

    assert_eq!(first, LoginOutcome::Authenticated);
    assert_eq!(second, LoginOutcome::Rejected);

    let state = manager.session().snapshot();
    assert!(!state.popup_open);
    assert_eq!(state.token.as_deref(), Some("gated-token"));
}

#[tokio::test]
async fn test_login_times_out() {
    let gated = Arc::new(GatedClient::default());
    let (manager, handle) = manager_with(gated).await;

    let options = PopupOptions {
        timeout: Some(Duration::from_millis(50)),
        ..PopupOptions::default()
    };
    let outcome = manager
        .login_with_popup(&handle, options, &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Failed);

    let state = manager.session().snapshot();
    assert!(!state.popup_open);
    assert!(!state.authenticated);
    assert!(matches!(state.error, Some(LoginError::TimedOut { .. })));
}

#[tokio::test]
async fn test_manager_default_timeout_applies() {
    let gated = Arc::new(GatedClient::default());
    let (manager, handle) = manager_with(gated).await;
    let manager = manager.with_login_timeout(Duration::from_millis(50));

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Failed);
    assert!(matches!(
        manager.session().error(),
        Some(LoginError::TimedOut { .. })
    ));
}

#[tokio::test]
async fn test_login_cancelled() {
    let gated = Arc::new(GatedClient::default());
    let (manager, handle) = manager_with(gated.clone()).await;
    let cancel = CancellationToken::new();

    let (outcome, ()) = tokio::join!(
        manager.login_with_popup(&handle, PopupOptions::default(), &cancel),
        async {
            gated.entered.notified().await;
            cancel.cancel();
        }
    );

    assert_eq!(outcome, LoginOutcome::Failed);
    let state = manager.session().snapshot();
    assert!(!state.popup_open);
    assert_eq!(state.error, Some(LoginError::Cancelled));

    // The flag is released, so the next attempt runs
    gated.release.notify_one();
    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Authenticated);
}

#[tokio::test]
async fn test_logout_clears_store_and_redirects_home() {
    let mut client = successful_client("ada@example.com", "T1");
    client
        .expect_logout()
        .times(1)
        .returning(|| Err(AuthError::provider("browser unavailable")));
    let (manager, handle) = manager_with(Arc::new(client)).await;

    let outcome = manager
        .login_with_popup(&handle, PopupOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(outcome, LoginOutcome::Authenticated);

    let redirect = manager.logout(&handle).await;
    assert_eq!(redirect.location, "/");
    assert_eq!(redirect.status, http::StatusCode::FOUND);

    let state = manager.session().snapshot();
    assert!(!state.authenticated);
    assert!(state.user.is_empty());
    assert_eq!(state.token, None);
    assert_eq!(state.error, None);
    assert_eq!(state.phase(), LoginPhase::Idle);
}
