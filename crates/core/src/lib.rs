//! zeronet console core types: settings, session state and errors

pub mod config;
pub mod error;
pub mod session;

pub use crate::config::{AuthSettings, ConsoleSettings};
pub use error::{AuthError, AuthResult, LoginError};
pub use session::{LoginPhase, SessionState, SessionStore, SessionView, StoreCell, UserProfile};
