//! Observable session state
//!
//! The session is five independent cells. Each cell is backed by a
//! [`tokio::sync::watch`] channel, so every `set` is visible to current
//! subscribers as soon as it returns. The store does not enforce any
//! relationship between cells; the auth session manager is the only writer.

use crate::error::LoginError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::watch;

/// Profile record returned by the identity provider
pub type UserProfile = Map<String, Value>;

/// A single observable value
#[derive(Debug)]
pub struct StoreCell<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone> StoreCell<T> {
    fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Receiver that observes every later `set`
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

#[derive(Debug)]
struct Cells {
    authenticated: StoreCell<bool>,
    user: StoreCell<UserProfile>,
    token: StoreCell<Option<String>>,
    popup_open: StoreCell<bool>,
    error: StoreCell<Option<LoginError>>,
}

impl Cells {
    fn snapshot(&self) -> SessionState {
        SessionState {
            authenticated: self.authenticated.get(),
            user: self.user.get(),
            token: self.token.get(),
            popup_open: self.popup_open.get(),
            error: self.error.get(),
        }
    }
}

/// Writable session store
#[derive(Clone, Debug)]
pub struct SessionStore {
    cells: Arc<Cells>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a store in the signed-out state
    pub fn new() -> Self {
        Self {
            cells: Arc::new(Cells {
                authenticated: StoreCell::new(false),
                user: StoreCell::new(UserProfile::new()),
                token: StoreCell::new(None),
                popup_open: StoreCell::new(false),
                error: StoreCell::new(None),
            }),
        }
    }

    pub fn authenticated(&self) -> &StoreCell<bool> {
        &self.cells.authenticated
    }

    pub fn user(&self) -> &StoreCell<UserProfile> {
        &self.cells.user
    }

    pub fn token(&self) -> &StoreCell<Option<String>> {
        &self.cells.token
    }

    pub fn popup_open(&self) -> &StoreCell<bool> {
        &self.cells.popup_open
    }

    pub fn error(&self) -> &StoreCell<Option<LoginError>> {
        &self.cells.error
    }

    /// Copy of every cell
    pub fn snapshot(&self) -> SessionState {
        self.cells.snapshot()
    }

    /// Read-only handle for consumers that must not write the session
    pub fn view(&self) -> SessionView {
        SessionView {
            cells: Arc::clone(&self.cells),
        }
    }
}

/// Read-only access to a [`SessionStore`]
#[derive(Clone, Debug)]
pub struct SessionView {
    cells: Arc<Cells>,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool {
        self.cells.authenticated.get()
    }

    pub fn user(&self) -> UserProfile {
        self.cells.user.get()
    }

    pub fn token(&self) -> Option<String> {
        self.cells.token.get()
    }

    pub fn popup_open(&self) -> bool {
        self.cells.popup_open.get()
    }

    pub fn error(&self) -> Option<LoginError> {
        self.cells.error.get()
    }

    pub fn subscribe_authenticated(&self) -> watch::Receiver<bool> {
        self.cells.authenticated.subscribe()
    }

    pub fn subscribe_user(&self) -> watch::Receiver<UserProfile> {
        self.cells.user.subscribe()
    }

    pub fn subscribe_token(&self) -> watch::Receiver<Option<String>> {
        self.cells.token.subscribe()
    }

    pub fn subscribe_popup_open(&self) -> watch::Receiver<bool> {
        self.cells.popup_open.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<LoginError>> {
        self.cells.error.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.cells.snapshot()
    }
}

/// Point-in-time copy of the session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub authenticated: bool,
    pub user: UserProfile,
    pub token: Option<String>,
    pub popup_open: bool,
    pub error: Option<LoginError>,
}

/// Where the session sits in the login state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginPhase {
    Idle,
    PopupOpening,
    Authenticated,
    Failed,
}

impl SessionState {
    pub const fn phase(&self) -> LoginPhase {
        if self.popup_open {
            LoginPhase::PopupOpening
        } else if self.authenticated {
            LoginPhase::Authenticated
        } else if self.error.is_some() {
            LoginPhase::Failed
        } else {
            LoginPhase::Idle
        }
    }
}
