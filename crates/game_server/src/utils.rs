//! Utility functions and helper methods for the login server.
//!
//! This module provides convenient factory functions for creating server
//! instances with different configurations.

use crate::{config::ServerConfig, error::ServerError, server::GameServer};
use aurora_core::SqliteBackend;
use std::sync::Arc;

/// Creates a new login server with default configuration.
///
/// # Example
///
/// ```no_run
/// use game_server::create_server;
///
/// let server = create_server().expect("database should open");
/// ```
pub fn create_server() -> Result<GameServer, ServerError> {
    GameServer::new(ServerConfig::default())
}

/// Creates a new login server with custom configuration.
///
/// # Example
///
/// ```no_run
/// use game_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:1119".parse().unwrap(),
///     max_connections: 5000,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config).expect("database should open");
/// ```
pub fn create_server_with_config(config: ServerConfig) -> Result<GameServer, ServerError> {
    GameServer::new(config)
}

/// Creates a server whose accounts live only in memory, ignoring
/// `config.database_path`.
pub fn create_in_memory_server(config: ServerConfig) -> Result<GameServer, ServerError> {
    let backend = SqliteBackend::open_in_memory()?;
    Ok(GameServer::with_backend(config, Arc::new(backend)))
}
