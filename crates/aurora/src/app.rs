//! Main application logic and lifecycle management.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use aurora_core::ShutdownState;
use game_server::{GameServer, ServerError, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long connections get to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Owns the merged configuration and the server built from it.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Login server instance
    server: GameServer,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates the result and
    /// opens the account database.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server = GameServer::new(config.to_server_config()?)?;
        Ok(Self { config, server })
    }

    /// Runs until a termination signal arrives or the server fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let state = self.server.state();
        let shutdown_state = ShutdownState::new();

        let mut server_handle: JoinHandle<Result<(), ServerError>> = {
            let server = self.server;
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move { server.start_with_shutdown_state(shutdown_state).await })
        };

        info!("✅ Aurora is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            signal = setup_signal_handlers(&shutdown_state) => signal?,
            finished = &mut server_handle => {
                // The server only returns on its own when startup failed.
                return match finished? {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        error!("❌ Server error: {}", e);
                        Err(e.into())
                    }
                };
            }
        }

        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("⏳ Waiting for connections to close...");
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task panicked: {}", e),
            Err(_) => {
                warn!("⏰ Server did not stop within {:?}, aborting", SHUTDOWN_GRACE);
                server_handle.abort();
            }
        }

        log_final_statistics(&state).await;
        info!("✅ Aurora shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  🗄️ Database: {}", self.config.database.path);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Idle timeout: {}s", self.config.server.connection_timeout);
        info!("  📦 Max packet size: {} bytes", self.config.server.max_packet_size);
    }
}

fn apply_overrides(config: &mut AppConfig, args: CliArgs) {
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(database_path) = args.database_path {
        config.database.path = database_path.to_string_lossy().into_owned();
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}

async fn log_final_statistics(state: &Arc<ServerState>) {
    info!("📊 Final Statistics:");
    info!("  - Accounts in memory: {}", state.accounts.len());
    info!(
        "  - Connections still open: {}",
        state.connections.connection_count().await
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_overrides_win_over_file() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: PathBuf::from("unused.toml"),
            bind_address: Some("0.0.0.0:1119".to_string()),
            database_path: Some(PathBuf::from(":memory:")),
            log_level: None,
            json_logs: true,
        };
        apply_overrides(&mut config, args);

        assert_eq!(config.server.bind_address, "0.0.0.0:1119");
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn application_builds_from_fresh_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("config.toml"),
            bind_address: Some("127.0.0.1:0".to_string()),
            database_path: Some(dir.path().join("accounts.db")),
            log_level: Some("debug".to_string()),
            json_logs: false,
        };

        let app = Application::new(args.clone()).await.unwrap();
        assert!(args.config_path.exists());
        assert_eq!(app.config.logging.level, "debug");
        assert_eq!(app.server.config().database_path, dir.path().join("accounts.db"));
    }

    #[tokio::test]
    async fn invalid_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("config.toml"),
            bind_address: None,
            database_path: None,
            log_level: Some("chatty".to_string()),
            json_logs: false,
        };
        assert!(Application::new(args).await.is_err());
    }
}
