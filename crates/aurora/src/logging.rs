//! Logging system setup.
//!
//! `RUST_LOG` takes precedence over the configured level. Output is either
//! human-readable or JSON lines, both tagged with thread ids and names.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `json_format` forces JSON output
/// regardless of the configuration file.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(true)
        .with_thread_names(true);

    if json_format || config.json_format {
        registry.with(layer.json()).try_init()?;
    } else {
        registry.with(layer.with_ansi(true)).try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║           🌌 AURORA LOGIN SERVER 🌌       ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  🔐 Email logon, durable accounts        ║");
    info!("║  👀 Live presence subscriptions          ║");
    info!("╚══════════════════════════════════════════╝");
}
