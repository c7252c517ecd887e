//! Connection manager for tracking live client sessions.

use super::{client::ClientSession, ConnectionId};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// Central registry of open connections.
///
/// Connection ids are assigned from an atomic counter and never reused
/// during the lifetime of the process.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Map of connection ID to its session
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<ClientSession>>>>,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicU64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new connection whose frames go out through `outbound`.
    pub async fn add_connection(
        &self,
        remote_addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Bytes>,
    ) -> Arc<ClientSession> {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(ClientSession::new(connection_id, remote_addr, outbound));
        self.connections
            .write()
            .await
            .insert(connection_id, Arc::clone(&session));
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        session
    }

    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Option<Arc<ClientSession>> {
        let removed = self.connections.write().await.remove(&connection_id);
        if let Some(session) = &removed {
            info!(
                "❌ Connection {} from {} disconnected",
                connection_id,
                session.remote_addr()
            );
        }
        removed
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<Arc<ClientSession>> {
        self.connections.read().await.get(&connection_id).cloned()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_unique_and_removal_is_idempotent() {
        let manager = ConnectionManager::new();
        let addr = SocketAddr::from(([127, 0, 0, 1], 9000));
        let (tx, _rx) = mpsc::unbounded_channel();

        let a = manager.add_connection(addr, tx.clone()).await;
        let b = manager.add_connection(addr, tx).await;
        assert_ne!(a.id(), b.id());
        assert_eq!(manager.connection_count().await, 2);
        assert_eq!(manager.connection_ids().await, vec![a.id(), b.id()]);

        assert!(manager.remove_connection(a.id()).await.is_some());
        assert!(manager.remove_connection(a.id()).await.is_none());
        assert!(manager.get(a.id()).await.is_none());
        assert!(manager.get(b.id()).await.is_some());
    }
}
