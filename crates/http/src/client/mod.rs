//! zeronet controller HTTP client

pub mod error;
pub mod peers;

use error::ClientError;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use zeronet_core::ConsoleSettings;

/// Controller API client.
///
/// Holds no credentials; every request is signed with the token the caller
/// passes in.
#[derive(Clone, Debug)]
pub struct ControllerClient {
    client: Client,
    base_url: String,
}

impl ControllerClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from console settings
    pub fn from_settings(settings: &ConsoleSettings) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&settings.controller_url)
            .timeout(settings.request_timeout())
            .build()
    }

    /// Create a new client builder
    pub fn builder() -> ControllerClientBuilder {
        ControllerClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a JSON request builder carrying a bearer token
    pub fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Execute a request and decode the JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for ControllerClient
#[derive(Default)]
pub struct ControllerClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ControllerClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ControllerClient, ClientError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("zeronet-console/", env!("CARGO_PKG_VERSION")).to_string());
        client_builder = client_builder.user_agent(user_agent);

        let client = client_builder.build()?;

        Ok(ControllerClient { client, base_url })
    }
}
