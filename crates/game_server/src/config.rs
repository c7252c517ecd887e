//! Server configuration types and defaults.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration structure for the login server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Seconds a connection may stay silent before it is closed (0 disables)
    pub connection_timeout: u64,

    /// Largest accepted request payload in bytes
    pub max_packet_size: usize,

    /// SQLite database holding accounts and toons
    pub database_path: PathBuf,
}

impl ServerConfig {
    /// Special database path that keeps everything in memory.
    pub const IN_MEMORY_DATABASE: &'static str = ":memory:";

    pub fn uses_in_memory_database(&self) -> bool {
        self.database_path.as_os_str() == Self::IN_MEMORY_DATABASE
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 1345)),
            max_connections: 1000,
            connection_timeout: 300,
            max_packet_size: 512 * 1024,
            database_path: PathBuf::from("aurora.db"),
        }
    }
}
