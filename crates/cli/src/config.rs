//! Console configuration loading

use anyhow::{Context, Result};
use zeronet_core::{AuthSettings, ConsoleSettings};

/// Identity provider and console settings resolved from the environment
#[derive(Debug)]
pub struct Settings {
    pub auth: AuthSettings,
    pub console: ConsoleSettings,
}

/// Load and validate every setting the console needs
pub fn load_settings() -> Result<Settings> {
    let auth = AuthSettings::from_env().context("Failed to read AUTH_* settings")?;
    auth.validate()?;

    let console = ConsoleSettings::from_env().context("Failed to read ZERONET_* settings")?;

    Ok(Settings { auth, console })
}
