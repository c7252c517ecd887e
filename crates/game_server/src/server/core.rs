//! Core login server implementation.
//!
//! This module contains the main `GameServer` struct: it owns the shared
//! [`ServerState`], loads persisted accounts, and runs the accept loop.

use crate::{config::ServerConfig, error::ServerError, server::handlers::handle_connection, state::ServerState};
use aurora_core::{AccountStore, ShutdownState, SqliteBackend, StorageBackend};
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The core login server structure.
///
/// `GameServer` ties together persistence, the account registry, presence
/// subscriptions and the RPC dispatch table, and serves them over TCP.
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// State shared with every connection task
    state: Arc<ServerState>,

    /// Shutdown flags used by [`start`](Self::start) and [`shutdown`](Self::shutdown)
    shutdown_state: ShutdownState,
}

impl GameServer {
    /// Creates a server backed by the SQLite database named in `config`.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let backend: Arc<dyn StorageBackend> = if config.uses_in_memory_database() {
            Arc::new(SqliteBackend::open_in_memory()?)
        } else {
            Arc::new(SqliteBackend::open(&config.database_path)?)
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Creates a server over an arbitrary storage backend.
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let state = Arc::new(ServerState::new(config.clone(), AccountStore::new(backend)));
        Self {
            config,
            state,
            shutdown_state: ShutdownState::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Loads persisted accounts and toons into memory.
    pub async fn load(&self) -> Result<usize, ServerError> {
        let loaded = self.state.accounts.load_all().await?;
        info!("📚 Loaded {} account(s)", loaded);
        Ok(loaded)
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))
    }

    /// Starts the server and runs until [`shutdown`](Self::shutdown) is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown_state(self.shutdown_state.clone()).await
    }

    /// Loads accounts, binds the configured address and serves connections
    /// until `shutdown_state` is initiated.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        info!("🚀 Starting login server on {}", self.config.bind_address);
        self.load().await?;
        let listener = self.bind().await?;
        self.serve(listener, shutdown_state).await
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Once shutdown is initiated the listener is dropped, every connection
    /// task releases its subscriptions and bindings, and shutdown is marked
    /// complete after the last one has finished.
    pub async fn serve(&self, listener: TcpListener, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            info!("👂 Listening on {}", addr);
        }
        let mut connections: FuturesUnordered<JoinHandle<()>> = FuturesUnordered::new();

        loop {
            tokio::select! {
                _ = shutdown_state.wait() => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
                Some(finished) = connections.next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if connections.len() >= self.config.max_connections {
                            warn!(
                                "⚠️ Rejecting {}: connection limit of {} reached",
                                addr, self.config.max_connections
                            );
                            continue;
                        }
                        connections.push(self.spawn_connection(stream, addr, shutdown_state.clone()));
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
        drop(listener);

        info!("🧹 Waiting for {} connection(s) to close...", connections.len());
        while let Some(finished) = connections.next().await {
            if let Err(e) = finished {
                error!("Connection task failed: {}", e);
            }
        }
        shutdown_state.complete_shutdown();
        info!("✅ Server cleanup completed");
        Ok(())
    }

    /// Initiates shutdown of a server started with [`start`](Self::start).
    pub fn shutdown(&self) {
        self.shutdown_state.initiate_shutdown();
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown_state.clone()
    }

    fn spawn_connection(
        &self,
        stream: tokio::net::TcpStream,
        addr: SocketAddr,
        shutdown_state: ShutdownState,
    ) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match handle_connection(stream, addr, state, shutdown_state).await {
                Ok(()) => debug!("Connection from {} finished", addr),
                Err(e) => debug!("Connection from {} ended with error: {}", addr, e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::Addressable;

    #[tokio::test]
    async fn accounts_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            database_path: dir.path().join("accounts.db"),
            ..Default::default()
        };

        let server = GameServer::new(config.clone()).unwrap();
        assert_eq!(server.load().await.unwrap(), 0);
        let (account, created) = server.state().accounts.find_or_create("keep@example.com").await.unwrap();
        assert!(created);
        server.state().accounts.create_toon(&account, "Li-Ming").await.unwrap();
        drop(server);

        let restarted = GameServer::new(config).unwrap();
        assert_eq!(restarted.load().await.unwrap(), 1);
        let reloaded = restarted.state().accounts.find_by_email("keep@example.com").unwrap();
        assert_eq!(reloaded.persistent_id(), account.persistent_id());
        assert_eq!(reloaded.toons().len(), 1);
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown() {
        let server = crate::create_in_memory_server(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownState::new();
        shutdown.initiate_shutdown();
        server.serve(listener, shutdown.clone()).await.unwrap();
        assert!(shutdown.is_shutdown_complete());
    }
}
