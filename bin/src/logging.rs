//! Log subscriber setup.

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log line format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

const fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` directives take precedence over the `-v` level.
pub(crate) fn init(verbose: u8, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level(verbose).into())
        .from_env()
        .context("Invalid RUST_LOG directive")?;

    let layer = fmt::layer().with_writer(std::io::stderr).with_target(verbose > 1);

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init(),
    }
    .context("Failed to install log subscriber")
}
