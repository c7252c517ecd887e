//! Per-connection session state.
//!
//! A [`ClientSession`] owns everything the protocol binds to one socket: the
//! services the client exported, the object ids it assigned to entities, and
//! the account it logged into.

use super::ConnectionId;
use crate::messaging::Packet;
use aurora_core::protocol::MethodRef;
use aurora_core::{Account, Addressable, DeliveryError, EntityId, RemoteEndpoint};
use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// First object id handed out for entities the client never named.
const FIRST_SERVER_OBJECT_ID: u64 = 1 << 32;

#[derive(Debug)]
pub struct ClientSession {
    id: ConnectionId,
    remote_addr: SocketAddr,
    connected_at: SystemTime,

    /// Frames queued for the writer task
    outbound: mpsc::UnboundedSender<Bytes>,

    next_request_id: AtomicU16,
    next_object_id: AtomicU64,

    /// Service name hash -> id the client exported it under
    exported: DashMap<u32, u32>,

    /// Entity -> object id used when calling the client about it
    objects: DashMap<EntityId, u64>,

    account: RwLock<Option<Arc<Account>>>,
}

impl ClientSession {
    pub fn new(id: ConnectionId, remote_addr: SocketAddr, outbound: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            id,
            remote_addr,
            connected_at: SystemTime::now(),
            outbound,
            next_request_id: AtomicU16::new(0),
            next_object_id: AtomicU64::new(FIRST_SERVER_OBJECT_ID),
            exported: DashMap::new(),
            objects: DashMap::new(),
            account: RwLock::new(None),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Records a service the client offers for outbound calls.
    pub fn export_service(&self, hash: u32, id: u32) {
        if let Some(previous) = self.exported.insert(hash, id) {
            debug!(
                "Connection {} re-exported service {:#010x}: {} -> {}",
                self.id, hash, previous, id
            );
        }
    }

    pub fn exported_service_id(&self, hash: u32) -> Option<u32> {
        self.exported.get(&hash).map(|id| *id)
    }

    /// Uses the object id the client picked for `entity` from now on.
    pub fn map_remote_object(&self, entity: EntityId, object_id: u64) {
        self.objects.insert(entity, object_id);
    }

    pub fn account(&self) -> Option<Arc<Account>> {
        self.account
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Attaches the logged-in account, returning the one it replaces.
    pub fn bind_account(&self, account: Arc<Account>) -> Option<Arc<Account>> {
        self.account
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(account)
    }

    /// Detaches the account only if it is the one with `persistent_id`.
    pub fn release_account(&self, persistent_id: u64) -> bool {
        let mut account = self.account.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if account.as_ref().is_some_and(|a| a.persistent_id() == persistent_id) {
            *account = None;
            true
        } else {
            false
        }
    }

    pub fn take_account(&self) -> Option<Arc<Account>> {
        self.account
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Queues the response to inbound request `request_id`.
    pub fn send_response(&self, request_id: u16, payload: Vec<u8>) {
        let frame = Packet::response(request_id, payload).to_bytes();
        if self.outbound.send(frame).is_err() {
            debug!(
                "Dropping response {} for closed connection {}",
                request_id, self.id
            );
        }
    }

    fn enqueue_call(&self, method: MethodRef, object_id: u64, payload: Vec<u8>) -> Result<(), DeliveryError> {
        let hash = method.service.hash();
        let service_id = self
            .exported_service_id(hash)
            .ok_or(DeliveryError::ServiceNotBound(method.service.name))?;
        let service_id = u8::try_from(service_id).map_err(|_| {
            DeliveryError::Transport(format!(
                "{} exported under out-of-range id {}",
                method.service.name, service_id
            ))
        })?;

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let frame = Packet::request(service_id, method.method.id, request_id, object_id, payload).to_bytes();
        trace!(
            "📨 Calling {}.{} on connection {} (object {}, request {})",
            method.service.name,
            method.method.name,
            self.id,
            object_id,
            request_id
        );
        self.outbound
            .send(frame)
            .map_err(|_| DeliveryError::Disconnected(self.id))
    }
}

impl RemoteEndpoint for ClientSession {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn bind_object(&self, entity: EntityId) -> u64 {
        *self
            .objects
            .entry(entity)
            .or_insert_with(|| self.next_object_id.fetch_add(1, Ordering::Relaxed))
    }

    fn call_method(
        &self,
        method: MethodRef,
        object_id: u64,
        payload: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + '_>> {
        let result = self.enqueue_call(method, object_id, payload);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::protocol::services::CHANNEL_SUBSCRIBER;
    use bytes::BytesMut;

    fn session() -> (ClientSession, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientSession::new(5, SocketAddr::from(([127, 0, 0, 1], 4000)), tx), rx)
    }

    fn next_packet(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Packet {
        let frame = rx.try_recv().expect("no frame queued");
        let mut buf = BytesMut::from(&frame[..]);
        Packet::decode(&mut buf, usize::MAX).unwrap().unwrap()
    }

    #[tokio::test]
    async fn calls_use_exported_id_and_object_id() {
        let (session, mut rx) = session();
        session.export_service(CHANNEL_SUBSCRIBER.hash(), 4);
        let entity = EntityId::new(1, 2);
        session.map_remote_object(entity, 77);
        let object_id = session.bind_object(entity);

        session
            .call_method(CHANNEL_SUBSCRIBER.method("NotifyAdd"), object_id, vec![9])
            .await
            .unwrap();

        let packet = next_packet(&mut rx);
        assert_eq!(packet.header.service_id, 4);
        assert_eq!(packet.header.method_id, 1);
        assert_eq!(packet.header.object_id, Some(77));
        assert_eq!(&packet.payload[..], &[9]);
    }

    #[tokio::test]
    async fn unexported_service_is_reported() {
        let (session, mut rx) = session();
        let err = session
            .call_method(CHANNEL_SUBSCRIBER.method("NotifyAdd"), 1, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryError::ServiceNotBound(CHANNEL_SUBSCRIBER.name));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_connection_is_reported() {
        let (session, rx) = session();
        session.export_service(CHANNEL_SUBSCRIBER.hash(), 4);
        drop(rx);
        let err = session
            .call_method(CHANNEL_SUBSCRIBER.method("NotifyAdd"), 1, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryError::Disconnected(5));
        assert!(session.is_closed());
    }

    #[test]
    fn object_ids_are_stable_per_entity() {
        let (session, _rx) = session();
        let a = session.bind_object(EntityId::new(1, 1));
        let b = session.bind_object(EntityId::new(1, 2));
        assert_ne!(a, b);
        assert_eq!(session.bind_object(EntityId::new(1, 1)), a);
        assert!(a >= FIRST_SERVER_OBJECT_ID);
    }

    #[test]
    fn release_account_only_drops_matching_account() {
        let (session, _rx) = session();
        session.bind_account(Arc::new(Account::with_persistent_id(3, "a@b.com")));
        assert!(!session.release_account(4));
        assert!(session.account().is_some());
        assert!(session.release_account(3));
        assert!(session.account().is_none());
    }

    #[test]
    fn responses_echo_request_id() {
        let (session, mut rx) = session();
        session.send_response(42, vec![1, 2]);
        let packet = next_packet(&mut rx);
        assert!(packet.header.is_response());
        assert_eq!(packet.header.request_id, 42);
    }
}
