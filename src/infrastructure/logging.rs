//! Logging initialization.
//!
//! Logs go to stderr so the CLI's rendered output owns stdout.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::domain::models::LoggingConfig;

/// Initialize the tracing subscriber from config. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
        }
        other => return Err(anyhow!("unknown log format: {other}")),
    }
    Ok(())
}
