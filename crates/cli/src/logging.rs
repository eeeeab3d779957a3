use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize stderr logging for the console.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: Level) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

fn default_directives(level: Level) -> String {
    let level_str = level.as_str().to_lowercase();
    format!("zeronet={level_str},zeronet_core={level_str},zeronet_http={level_str}")
}
