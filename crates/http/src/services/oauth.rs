//! OAuth2 Authorization Code + PKCE provider
//!
//! Works against any OIDC issuer that publishes a discovery document
//! (Auth0 included). The interactive step opens the authorization URL in the
//! system browser and captures the redirect on a loopback listener.

use super::callback::CallbackListener;
use super::identity::{IdentityClient, IdentityProvider, PopupOptions};
use super::pkce;
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;
use zeronet_core::{AuthError, AuthSettings, LoginError, UserProfile};

/// Scopes requested at login
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Opens URLs for the user
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), String>;
}

/// Opens URLs in the default browser
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), String> {
        opener::open_browser(url.as_str()).map_err(|e| e.to_string())
    }
}

/// Subset of the OIDC discovery document this client uses
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone, Debug)]
struct TokenSet {
    access_token: String,
    audience: String,
    expires_at: Option<Instant>,
}

impl TokenSet {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// OIDC provider reached over HTTPS
#[derive(Clone)]
pub struct OAuthProvider {
    http: reqwest::Client,
    opener: Arc<dyn UrlOpener>,
}

impl Default for OAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthProvider {
    /// Provider that opens the system browser
    pub fn new() -> Self {
        Self::with_opener(Arc::new(SystemBrowser))
    }

    /// Provider that hands authorization URLs to `opener`
    pub fn with_opener(opener: Arc<dyn UrlOpener>) -> Self {
        Self {
            http: reqwest::Client::new(),
            opener,
        }
    }

    /// Use a preconfigured HTTP client for provider calls
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    async fn discover(&self, issuer: &Url) -> Result<ProviderMetadata, AuthError> {
        let url = format!("{}{DISCOVERY_PATH}", issuer.as_str().trim_end_matches('/'));
        debug!(%url, "Fetching provider metadata");

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::provider(format!("discovery request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::provider(format!(
                "discovery returned {status} for {url}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::provider(format!("invalid discovery document: {e}")))
    }
}

impl std::fmt::Debug for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for OAuthProvider {
    async fn connect(&self, settings: &AuthSettings) -> Result<Arc<dyn IdentityClient>, AuthError> {
        let issuer = issuer_url(&settings.domain)?;
        let redirect_uri = Url::parse(&settings.redirect_uri).map_err(|e| {
            AuthError::configuration(format!("invalid AUTH_CALLBACK_URL {}: {e}", settings.redirect_uri))
        })?;

        let metadata = self.discover(&issuer).await?;
        info!(issuer = %issuer, "Connected to identity provider");

        Ok(Arc::new(OAuthClient {
            http: self.http.clone(),
            opener: Arc::clone(&self.opener),
            client_id: settings.client_id.clone(),
            audience: settings.audience.clone(),
            redirect_uri,
            metadata,
            tokens: RwLock::new(None),
        }))
    }
}

/// `https://{domain}` unless the domain already names a scheme
fn issuer_url(domain: &str) -> Result<Url, AuthError> {
    let raw = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    Url::parse(&raw)
        .map_err(|e| AuthError::configuration(format!("invalid AUTH_BASE_URL {domain}: {e}")))
}

struct OAuthClient {
    http: reqwest::Client,
    opener: Arc<dyn UrlOpener>,
    client_id: String,
    audience: String,
    redirect_uri: Url,
    metadata: ProviderMetadata,
    tokens: RwLock<Option<TokenSet>>,
}

impl OAuthClient {
    fn authorization_url(
        &self,
        redirect_uri: &Url,
        state: &str,
        code_verifier: &str,
        options: &PopupOptions,
    ) -> Result<Url, LoginError> {
        let mut url = Url::parse(&self.metadata.authorization_endpoint)
            .map_err(|e| LoginError::popup(format!("invalid authorization endpoint: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", redirect_uri.as_str())
                .append_pair("scope", DEFAULT_SCOPE)
                .append_pair("audience", &self.audience)
                .append_pair("state", state)
                .append_pair("code_challenge", &pkce::code_challenge(code_verifier))
                .append_pair("code_challenge_method", "S256");
            if let Some(prompt) = &options.prompt {
                query.append_pair("prompt", prompt);
            }
            if let Some(login_hint) = &options.login_hint {
                query.append_pair("login_hint", login_hint);
            }
        }

        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &Url,
        code_verifier: &str,
    ) -> Result<TokenSet, LoginError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&self.metadata.token_endpoint)
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| LoginError::popup(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoginError::popup(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| LoginError::popup(format!("invalid token response: {e}")))?;

        Ok(TokenSet {
            access_token: tokens.access_token,
            audience: self.audience.clone(),
            expires_at: tokens
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }

    fn logout_url(&self) -> Result<Option<Url>, AuthError> {
        let Some(endpoint) = &self.metadata.end_session_endpoint else {
            return Ok(None);
        };

        let mut url = Url::parse(endpoint)
            .map_err(|e| AuthError::provider(format!("invalid end session endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", self.redirect_uri.origin().ascii_serialization().as_str());
        Ok(Some(url))
    }
}

#[async_trait]
impl IdentityClient for OAuthClient {
    async fn login_with_popup(&self, options: &PopupOptions) -> Result<(), LoginError> {
        let listener = CallbackListener::bind(&self.redirect_uri).await?;
        let redirect_uri = listener.redirect_uri().clone();

        let code_verifier = pkce::generate_code_verifier();
        let state = pkce::generate_state();
        let authorize_url = self.authorization_url(&redirect_uri, &state, &code_verifier, options)?;

        info!(url = %authorize_url, "Opening identity provider login");
        if let Err(err) = self.opener.open(&authorize_url) {
            warn!(error = %err, "Could not open a browser; open this URL manually: {authorize_url}");
        }

        let callback = listener.wait().await?;
        if callback.state != state {
            return Err(LoginError::callback("state mismatch"));
        }

        let tokens = self
            .exchange_code(&callback.code, &redirect_uri, &code_verifier)
            .await?;
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }

    async fn get_user(&self) -> Result<UserProfile, LoginError> {
        let access_token = self
            .tokens
            .read()
            .await
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
            .ok_or_else(|| LoginError::profile("not logged in"))?;

        let endpoint = self
            .metadata
            .userinfo_endpoint
            .as_deref()
            .ok_or_else(|| LoginError::profile("provider has no userinfo endpoint"))?;

        let response = self
            .http
            .get(endpoint)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LoginError::profile(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoginError::profile(format!("userinfo returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| LoginError::profile(format!("invalid userinfo response: {e}")))
    }

    async fn get_token_silently(&self, audience: &str) -> Result<String, LoginError> {
        let tokens = self.tokens.read().await;
        let tokens = tokens
            .as_ref()
            .ok_or_else(|| LoginError::token("login required"))?;

        if tokens.audience != audience {
            return Err(LoginError::token(format!(
                "no token for audience '{audience}'; login required"
            )));
        }
        if tokens.is_expired() {
            return Err(LoginError::token("access token expired; login required"));
        }

        Ok(tokens.access_token.clone())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.tokens.write().await.take();

        if let Some(url) = self.logout_url()? {
            info!(url = %url, "Ending provider session");
            self.opener
                .open(&url)
                .map_err(|e| AuthError::provider(format!("cannot open logout URL: {e}")))?;
        }
        Ok(())
    }
}
