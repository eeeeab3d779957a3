//! CLI commands

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zeronet_core::SessionStore;
use zeronet_http::{
    AuthSessionManager, ClientHandle, ControllerClient, LoginOutcome, OAuthProvider, Peer,
    PopupOptions,
};

use crate::config::{self, Settings};

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved configuration
    Config,

    /// Log in through the browser and print the profile
    Login {
        /// Also print the access token
        #[arg(long)]
        show_token: bool,

        /// End the session once logged in
        #[arg(long)]
        logout: bool,
    },

    /// Log in and list the controller's peers
    Peers {
        /// Print the controller's JSON unmodified
        #[arg(long)]
        raw: bool,
    },
}

impl Commands {
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Config => show_config(),
            Self::Login { show_token, logout } => login(show_token, logout).await,
            Self::Peers { raw } => list_peers(raw).await,
        }
    }
}

fn show_config() -> Result<()> {
    let Settings { auth, console } = config::load_settings()?;
    let resolved = json!({ "auth": auth, "console": console });
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

async fn login(show_token: bool, logout: bool) -> Result<()> {
    let settings = config::load_settings()?;
    let (manager, client) = sign_in(&settings).await?;
    let session = manager.session();

    println!("{}", serde_json::to_string_pretty(&session.user())?);
    if show_token {
        if let Some(token) = session.token() {
            println!("{token}");
        }
    }

    if logout {
        let redirect = manager.logout(&client).await;
        println!("Logged out, redirecting to {} ({})", redirect.location, redirect.status);
    }

    Ok(())
}

async fn list_peers(raw: bool) -> Result<()> {
    let settings = config::load_settings()?;
    let controller = ControllerClient::from_settings(&settings.console)?;
    let (manager, _client) = sign_in(&settings).await?;

    let page = controller.load_peers(&manager.session()).await?;
    if raw {
        println!("{}", serde_json::to_string_pretty(&page.peers)?);
        return Ok(());
    }

    let peers = page
        .typed()
        .context("Unexpected peer list shape, rerun with --raw to inspect it")?;
    print_peers(&peers);
    Ok(())
}

/// Create a client and run one browser login. Ctrl-C cancels the attempt.
async fn sign_in(settings: &Settings) -> Result<(AuthSessionManager, ClientHandle)> {
    let provider = Arc::new(OAuthProvider::new());
    let manager = AuthSessionManager::new(provider, SessionStore::new())
        .with_login_timeout(settings.console.login_timeout());
    let client = manager.create_client(&settings.auth).await?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, cancelling login");
                cancel.cancel();
            }
        }
    });

    info!("Waiting for browser login");
    let outcome = manager
        .login_with_popup(&client, PopupOptions::default(), &cancel)
        .await;
    interrupt.abort();

    match outcome {
        LoginOutcome::Authenticated => Ok((manager, client)),
        LoginOutcome::Failed => match manager.session().error() {
            Some(err) => bail!("Login failed: {err}"),
            None => bail!("Login failed"),
        },
        LoginOutcome::Rejected => bail!("Another login is already in progress"),
    }
}

fn print_peers(peers: &[Peer]) {
    if peers.is_empty() {
        println!("No peers");
        return;
    }

    let now = Utc::now();
    println!(
        "{:<6} {:<24} {:<18} {:<10} {:<9} USER",
        "ID", "HOSTNAME", "IP", "CONNECTED", "AUTH"
    );
    for peer in peers {
        let auth = if peer.disabled {
            "disabled"
        } else if peer.is_auth_expired(now) {
            "expired"
        } else {
            "valid"
        };
        println!(
            "{:<6} {:<24} {:<18} {:<10} {:<9} {}",
            peer.id, peer.hostname, peer.ip, peer.connected, auth, peer.user
        );
    }
}
