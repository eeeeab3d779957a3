//! Common types used by the client and the session manager

use chrono::{DateTime, Duration, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Days after which a peer must authenticate again
pub const PEER_AUTH_MAX_AGE_DAYS: i64 = 30;

/// Body of `GET /api/peers`, passed through exactly as the controller sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeersPage {
    pub peers: JsonValue,
}

impl PeersPage {
    /// Decode the body as controller peer records.
    ///
    /// A `null` body is an empty list.
    pub fn typed(&self) -> Result<Vec<Peer>, serde_json::Error> {
        if self.peers.is_null() {
            return Ok(Vec::new());
        }
        Vec::<Peer>::deserialize(&self.peers)
    }
}

/// Peer record as the controller serializes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: u32,
    #[serde(default)]
    pub machine_id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(rename = "LastLogin", default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "LastAuth", default)]
    pub last_auth: Option<DateTime<Utc>>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Peer {
    /// Whether the peer's last authentication is too old to be trusted
    pub fn is_auth_expired(&self, now: DateTime<Utc>) -> bool {
        self.last_auth
            .is_none_or(|last| now - last >= Duration::days(PEER_AUTH_MAX_AGE_DAYS))
    }
}

/// Client-side navigation requested by an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: StatusCode,
}

impl Redirect {
    /// Temporary (302) redirect
    pub fn temporary(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: StatusCode::FOUND,
        }
    }
}
