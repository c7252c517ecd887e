//! Configuration management for the Aurora login server.
//!
//! Settings come from a TOML file, are overridden by command-line flags and
//! end up as a [`game_server::ServerConfig`].

use game_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_max_connections() -> usize {
    1000
}

fn default_connection_timeout() -> u64 {
    300
}

fn default_max_packet_size() -> usize {
    512 * 1024
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network binding and connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:1345")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle timeout in seconds, 0 to disable
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Largest request payload accepted, in bytes
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

/// Where accounts and toons are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:` for a throwaway store
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "aurora.db".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:1345".to_string(),
                max_connections: default_max_connections(),
                connection_timeout: default_connection_timeout(),
                max_packet_size: default_max_packet_size(),
            },
            database: DatabaseSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, or writes the defaults there when it does not exist yet.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let bind_address: SocketAddr = self.server.bind_address.parse()?;
        Ok(ServerConfig {
            bind_address,
            max_connections: self.server.max_connections,
            connection_timeout: self.server.connection_timeout,
            max_packet_size: self.server.max_packet_size,
            database_path: PathBuf::from(&self.database.path),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.max_packet_size == 0 {
            return Err("server.max_packet_size must be greater than 0".to_string());
        }

        if self.database.path.trim().is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_converts() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server = config.to_server_config().unwrap();
        assert_eq!(server.bind_address, "127.0.0.1:1345".parse().unwrap());
        assert_eq!(server.max_connections, 1000);
        assert_eq!(server.connection_timeout, 300);
        assert_eq!(server.database_path, PathBuf::from("aurora.db"));
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.server.bind_address, "127.0.0.1:1345");

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.database.path, config.database.path);
    }

    #[tokio::test]
    async fn omitted_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        tokio::fs::write(&path, "[server]\nbind_address = \"0.0.0.0:1119\"\n")
            .await
            .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:1119");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.max_packet_size, 512 * 1024);
        assert_eq!(config.database.path, "aurora.db");
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[server\nbind_address = ").await.unwrap();
        assert!(AppConfig::load_from_file(&path).await.is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());
        assert!(config.to_server_config().is_err());

        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.path = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn in_memory_database_is_accepted() {
        let mut config = AppConfig::default();
        config.database.path = ServerConfig::IN_MEMORY_DATABASE.to_string();
        assert!(config.validate().is_ok());
        assert!(config.to_server_config().unwrap().uses_in_memory_database());
    }
}
