// Logging module - Logging infrastructure
use crate::domain::error::{PeriboardError, PeriboardResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// `RUST_LOG` wins when set; otherwise the configured default level is
/// applied to this crate's spans.
pub fn init_logging(default_level: &str) -> PeriboardResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("periboard={},warn", default_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| PeriboardError::Config {
            message: format!("failed to initialize logging: {}", e),
        })?;

    tracing::debug!("logging initialized");
    Ok(())
}
