//! Peer listing

use super::{ClientError, ControllerClient};
use crate::types::PeersPage;
use reqwest::Method;
use serde_json::Value;
use zeronet_core::SessionView;

/// Controller endpoint listing every peer
pub const PEERS_PATH: &str = "/api/peers";

impl ControllerClient {
    /// Fetch the peer list with the session's current token.
    ///
    /// The token is read once, before the request is sent. Exactly one GET is
    /// issued and the body is returned unmodified; there is no retry.
    pub async fn load_peers(&self, session: &SessionView) -> Result<PeersPage, ClientError> {
        let token = session.token().ok_or(ClientError::NotAuthenticated)?;

        debug!(url = %format!("{}{PEERS_PATH}", self.base_url()), "Loading peers");
        let request = self.request(Method::GET, PEERS_PATH, &token);
        let peers: Value = self.execute(request).await?;

        Ok(PeersPage { peers })
    }
}
