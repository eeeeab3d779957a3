//! Loopback listener for the provider's authorization redirect

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;
use zeronet_core::LoginError;

const SUCCESS_PAGE: &str = r"<html>
  <body>
    <h1>Login successful!</h1>
    <h2>You can close this window and return to the terminal.</h2>
  </body>
</html>";

const FAILURE_PAGE: &str = r"<html>
  <body>
    <h1>Login failed</h1>
    <h2>Return to the terminal for details.</h2>
  </body>
</html>";

/// Parameters the provider appends to the redirect URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn into_result(self) -> Result<AuthorizationCode, LoginError> {
        if let Some(error) = self.error {
            let message = match self.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            };
            return Err(LoginError::popup(message));
        }

        match (self.code, self.state) {
            (Some(code), Some(state)) => Ok(AuthorizationCode { code, state }),
            (None, _) => Err(LoginError::callback("missing 'code' parameter")),
            (_, None) => Err(LoginError::callback("missing 'state' parameter")),
        }
    }
}

type PendingCallback = Arc<Mutex<Option<oneshot::Sender<Result<AuthorizationCode, LoginError>>>>>;

/// A bound listener waiting for exactly one redirect
pub struct CallbackListener {
    listener: TcpListener,
    redirect_uri: Url,
}

impl CallbackListener {
    /// Bind the host and port of `redirect_uri`.
    ///
    /// Port 0 binds a free port; [`Self::redirect_uri`] then carries the
    /// port actually bound.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, LoginError> {
        if redirect_uri.scheme() != "http" {
            return Err(LoginError::callback(format!(
                "loopback redirect URI must use http: {redirect_uri}"
            )));
        }

        let addrs = redirect_uri
            .socket_addrs(|| None)
            .map_err(|e| LoginError::callback(format!("invalid redirect URI {redirect_uri}: {e}")))?;
        let listener = TcpListener::bind(addrs.as_slice())
            .await
            .map_err(|e| LoginError::callback(format!("cannot listen for {redirect_uri}: {e}")))?;

        let mut redirect_uri = redirect_uri.clone();
        if redirect_uri.port() == Some(0) {
            let port = listener
                .local_addr()
                .map_err(|e| LoginError::callback(e.to_string()))?
                .port();
            redirect_uri
                .set_port(Some(port))
                .map_err(|()| LoginError::callback("cannot rewrite redirect port"))?;
        }

        Ok(Self {
            listener,
            redirect_uri,
        })
    }

    /// Redirect URI to send to the provider
    pub const fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Serve until the first redirect arrives, then shut down
    pub async fn wait(self) -> Result<AuthorizationCode, LoginError> {
        let (sender, receiver) = oneshot::channel();
        let pending: PendingCallback = Arc::new(Mutex::new(Some(sender)));

        let path = match self.redirect_uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        let app = Router::new()
            .route(&path, get(handle_callback))
            .with_state(pending);

        let shutdown = CancellationToken::new();
        let _stop_on_exit = shutdown.clone().drop_guard();
        let server = axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned());

        tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "Login callback listener failed");
            }
        });

        debug!(redirect_uri = %self.redirect_uri, "Waiting for login callback");
        receiver.await.map_err(|_| {
            LoginError::callback("listener stopped before the provider redirected")
        })?
    }
}

async fn handle_callback(
    State(pending): State<PendingCallback>,
    Query(query): Query<CallbackQuery>,
) -> Html<&'static str> {
    let result = query.into_result();
    let page = if result.is_ok() {
        SUCCESS_PAGE
    } else {
        FAILURE_PAGE
    };

    let sender = pending.lock().ok().and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }

    Html(page)
}
