//! Connection handling logic for protocol clients.
//!
//! Each accepted socket runs [`handle_connection`] on its own task. Inbound
//! packets are dispatched strictly in arrival order; responses and outbound
//! calls are queued on a channel and written by a companion future, so a
//! slow handler never blocks delivery to this client from other tasks.

use crate::{
    connection::ClientSession,
    error::ServerError,
    messaging::{route_packet, Packet},
    state::ServerState,
};
use aurora_core::ShutdownState;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const READ_CHUNK: usize = 4096;

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Register the session with the connection manager
/// 2. Read and dispatch packets until the peer closes, the idle timeout
///    fires, framing fails or shutdown is initiated
/// 3. Release every subscription and account binding the session held
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: ShutdownState,
) -> Result<(), ServerError> {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", addr, e);
    }
    let (mut reader, mut writer) = stream.into_split();
    let (outbound, mut frames) = mpsc::unbounded_channel::<Bytes>();
    let session = state.connections.add_connection(addr, outbound).await;
    let connection_id = session.id();

    // Incoming task - frames bytes into packets and dispatches them
    let incoming_task = read_packets(&state, &session, &mut reader);

    // Outgoing task - writes queued responses and notifications
    let outgoing_task = async move {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                error!("Failed to send to connection {}: {}", connection_id, e);
                break;
            }
        }
        if let Err(e) = writer.shutdown().await {
            debug!("Could not shut down writer for connection {}: {}", connection_id, e);
        }
    };

    let result = tokio::select! {
        result = incoming_task => result,
        _ = outgoing_task => Ok(()),
        _ = shutdown.wait() => {
            debug!("🛑 Closing connection {} for shutdown", connection_id);
            Ok(())
        }
    };

    if let Err(ServerError::Protocol(e)) = &result {
        warn!("⚠️ Dropping connection {}: {}", connection_id, e);
    }

    release_connection(&state, &session).await;
    result
}

/// Reads and dispatches packets until the peer closes, the idle timeout
/// fires or the stream can no longer be framed.
async fn read_packets(
    state: &Arc<ServerState>,
    session: &Arc<ClientSession>,
    reader: &mut OwnedReadHalf,
) -> Result<(), ServerError> {
    let connection_id = session.id();
    let max_packet_size = state.config.max_packet_size;
    let idle = Duration::from_secs(state.config.connection_timeout);
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    loop {
        while let Some(packet) = Packet::decode(&mut buffer, max_packet_size)? {
            route_packet(state, session, packet).await;
        }

        let read = if idle.is_zero() {
            reader.read_buf(&mut buffer).await
        } else {
            match tokio::time::timeout(idle, reader.read_buf(&mut buffer)).await {
                Ok(read) => read,
                Err(_) => {
                    info!("⏱️ Connection {} idle for {:?}, closing", connection_id, idle);
                    return Ok(());
                }
            }
        };

        match read {
            Ok(0) => {
                debug!("🔌 Client {} closed the connection", connection_id);
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ServerError::Network(format!(
                    "read from connection {connection_id} failed: {e}"
                )))
            }
        }
    }
}

/// Undoes everything a session registered: its subscriptions, its account
/// binding and its entry in the connection manager.
pub async fn release_connection(state: &ServerState, session: &ClientSession) {
    let connection_id = session.id();

    let dropped = state.notifier.remove_connection(connection_id);
    if !dropped.is_empty() {
        debug!(
            "🧹 Released {} subscription(s) of connection {}",
            dropped.len(),
            connection_id
        );
    }

    if let Some(account) = session.take_account() {
        if account.clear_session(connection_id) {
            info!(
                "🔓 Account {} logged out (connection {})",
                account.email(),
                connection_id
            );
            state.notifier.notify_changed(&account).await;
        }
    }

    state.connections.remove_connection(connection_id).await;
}
