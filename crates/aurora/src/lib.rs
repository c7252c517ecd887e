//! # Aurora Login Server - Main Entry Point
//!
//! Parses the command line, loads configuration, installs logging and runs
//! the login server until it receives a termination signal.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! aurora
//!
//! # Specify custom configuration
//! aurora --config production.toml
//!
//! # Override specific settings
//! aurora --bind 0.0.0.0:1345 --database /var/lib/aurora/accounts.db --log-level debug
//!
//! # JSON logging for production
//! aurora --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT or SIGTERM stops the listener, logs every session out and clears
//! all presence subscriptions. A second signal exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the whole application lifecycle. Exits the process with status 1
/// on startup or runtime failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, so read it before anything logs.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{DatabaseSettings, LoggingSettings, ServerSettings};
