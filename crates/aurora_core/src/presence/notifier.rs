//! # Subscription Notifier
//!
//! Tracks which connections observe which entities and pushes complete field
//! snapshots to them as `ChannelSubscriber.NotifyAdd` calls.
//!
//! Every notification is a full overwrite built from one consistent read of
//! the entity, so re-delivery and reordering are harmless. Delivery to each
//! subscriber succeeds or fails on its own and never undoes a subscription.

use super::directory::{FieldDirectory, PresenceSource};
use crate::entity_id::EntityId;
use crate::protocol::services::CHANNEL_SUBSCRIBER;
use crate::protocol::{bnet, channel, presence as wire, MethodRef};
use dashmap::DashMap;
use futures::future::join_all;
use prost::Message;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection {0} is closed")]
    Disconnected(u64),
    #[error("client did not export {0}")]
    ServiceNotBound(&'static str),
    #[error("outbound call failed: {0}")]
    Transport(String),
}

/// The client side of a connection, as seen by the server.
pub trait RemoteEndpoint: Send + Sync + std::fmt::Debug {
    fn connection_id(&self) -> u64;

    /// Returns the connection-scoped routing id for `entity`, assigning one
    /// on first use. Outbound calls about an entity are addressed with it.
    fn bind_object(&self, entity: EntityId) -> u64;

    /// Issues an outbound call to a service the client exported.
    fn call_method(
        &self,
        method: MethodRef,
        object_id: u64,
        payload: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + '_>>;
}

type Subscribers = HashMap<u64, Arc<dyn RemoteEndpoint>>;

pub struct SubscriptionNotifier<S: PresenceSource> {
    directory: Arc<FieldDirectory<S::View>>,
    notify_add: MethodRef,
    /// entity -> subscribed connections
    by_entity: DashMap<EntityId, Subscribers>,
    /// connection -> entities it observes
    by_connection: DashMap<u64, HashSet<EntityId>>,
}

impl<S: PresenceSource> SubscriptionNotifier<S> {
    pub fn new(directory: Arc<FieldDirectory<S::View>>) -> Self {
        Self {
            directory,
            notify_add: CHANNEL_SUBSCRIBER.method("NotifyAdd"),
            by_entity: DashMap::new(),
            by_connection: DashMap::new(),
        }
    }

    pub fn directory(&self) -> &FieldDirectory<S::View> {
        &self.directory
    }

    /// Wraps a fresh snapshot of `entity` for delivery.
    pub fn build_add_notification(&self, entity: &S) -> channel::AddNotification {
        let ops = self.directory.snapshot(entity);
        let presence = wire::ChannelState {
            entity_id: Some(bnet::EntityId::from(entity.primary_entity_id())),
            field_operation: ops.iter().map(|op| op.to_wire()).collect(),
        };
        channel::AddNotification {
            channel_state: channel::ChannelState {
                presence: Some(presence),
            },
        }
    }

    /// Sends one snapshot of `entity` to `client`.
    pub async fn on_subscribe(&self, client: &dyn RemoteEndpoint, entity: &S) -> Result<(), DeliveryError> {
        let notification = self.build_add_notification(entity);
        self.deliver(client, entity.primary_entity_id(), notification.encode_to_vec())
            .await
    }

    /// Records the subscription, then delivers the initial snapshot. A failed
    /// delivery is logged; the subscription stays in place.
    pub async fn subscribe(&self, client: Arc<dyn RemoteEndpoint>, entity: &S) {
        let entity_id = entity.primary_entity_id();
        let connection_id = client.connection_id();

        self.by_entity
            .entry(entity_id)
            .or_default()
            .insert(connection_id, Arc::clone(&client));
        self.by_connection
            .entry(connection_id)
            .or_default()
            .insert(entity_id);
        info!("👀 Connection {} subscribed to {}", connection_id, entity_id);

        if let Err(e) = self.on_subscribe(client.as_ref(), entity).await {
            error!(
                "❌ Failed to deliver initial snapshot of {} to connection {}: {}",
                entity_id, connection_id, e
            );
        }
    }

    /// Returns whether a subscription existed.
    pub fn unsubscribe(&self, connection_id: u64, entity_id: EntityId) -> bool {
        let removed = self.detach(connection_id, entity_id);
        if let Some(mut entities) = self.by_connection.get_mut(&connection_id) {
            entities.remove(&entity_id);
        }
        self.by_connection.remove_if(&connection_id, |_, entities| entities.is_empty());
        if removed {
            debug!("Connection {} unsubscribed from {}", connection_id, entity_id);
        }
        removed
    }

    /// Drops every subscription held by a connection. Returns the entities it
    /// was observing.
    pub fn remove_connection(&self, connection_id: u64) -> Vec<EntityId> {
        let Some((_, entities)) = self.by_connection.remove(&connection_id) else {
            return Vec::new();
        };
        let mut entities: Vec<EntityId> = entities.into_iter().collect();
        entities.sort();
        for entity_id in &entities {
            self.detach(connection_id, *entity_id);
        }
        if !entities.is_empty() {
            info!(
                "🧹 Removed {} subscription(s) of connection {}",
                entities.len(),
                connection_id
            );
        }
        entities
    }

    /// Pushes a fresh snapshot of `entity` to every current subscriber.
    /// Returns how many deliveries succeeded.
    pub async fn notify_changed(&self, entity: &S) -> usize {
        let entity_id = entity.primary_entity_id();
        let subscribers: Vec<Arc<dyn RemoteEndpoint>> = match self.by_entity.get(&entity_id) {
            Some(subs) => subs.values().cloned().collect(),
            None => return 0,
        };
        if subscribers.is_empty() {
            return 0;
        }

        let payload = self.build_add_notification(entity).encode_to_vec();
        let deliveries = subscribers.iter().map(|client| {
            let payload = payload.clone();
            async move {
                let result = self.deliver(client.as_ref(), entity_id, payload).await;
                if let Err(e) = &result {
                    warn!(
                        "⚠️ Could not notify connection {} about {}: {}",
                        client.connection_id(),
                        entity_id,
                        e
                    );
                }
                result.is_ok()
            }
        });

        join_all(deliveries).await.into_iter().filter(|ok| *ok).count()
    }

    pub fn subscriber_count(&self, entity_id: EntityId) -> usize {
        self.by_entity.get(&entity_id).map_or(0, |subs| subs.len())
    }

    pub fn subscriptions_of(&self, connection_id: u64) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self
            .by_connection
            .get(&connection_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        entities.sort();
        entities
    }

    async fn deliver(
        &self,
        client: &dyn RemoteEndpoint,
        entity_id: EntityId,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let object_id = client.bind_object(entity_id);
        client.call_method(self.notify_add, object_id, payload).await?;
        debug!(
            "📨 NotifyAdd for {} sent to connection {} (object {})",
            entity_id,
            client.connection_id(),
            object_id
        );
        Ok(())
    }

    fn detach(&self, connection_id: u64, entity_id: EntityId) -> bool {
        let removed = match self.by_entity.get_mut(&entity_id) {
            Some(mut subs) => subs.remove(&connection_id).is_some(),
            None => false,
        };
        self.by_entity.remove_if(&entity_id, |_, subs| subs.is_empty());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, Toon};
    use crate::entity_id::Addressable;
    use crate::presence::resolvers::account_directory;
    use crate::presence::{FieldKey, Program};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingEndpoint {
        id: u64,
        fail: bool,
        calls: Mutex<Vec<(&'static str, u64, Vec<u8>)>>,
    }

    impl RecordingEndpoint {
        fn new(id: u64, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id,
                fail,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(&'static str, u64, Vec<u8>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteEndpoint for RecordingEndpoint {
        fn connection_id(&self) -> u64 {
            self.id
        }

        fn bind_object(&self, entity: EntityId) -> u64 {
            entity.low + 1000
        }

        fn call_method(
            &self,
            method: MethodRef,
            object_id: u64,
            payload: Vec<u8>,
        ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + '_>> {
            Box::pin(async move {
                if self.fail {
                    return Err(DeliveryError::Disconnected(self.id));
                }
                self.calls.lock().unwrap().push((method.method.name, object_id, payload));
                Ok(())
            })
        }
    }

    fn notifier() -> SubscriptionNotifier<Account> {
        SubscriptionNotifier::new(Arc::new(account_directory()))
    }

    fn decode(payload: &[u8]) -> wire::ChannelState {
        let notification = channel::AddNotification::decode(payload).unwrap();
        notification.channel_state.presence.unwrap()
    }

    #[tokio::test]
    async fn subscribe_with_active_toon_sends_four_operations() {
        let account = Account::with_persistent_id(1, "a@b.com");
        let toon = Toon::with_persistent_id(5, 1, "Hero");
        account.add_toon(toon.clone());
        account.bind_session(77);
        account.select_toon(5).unwrap();

        let notifier = notifier();
        let client = RecordingEndpoint::new(77, false);
        notifier.subscribe(client.clone(), &account).await;

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        let (method, object_id, payload) = &calls[0];
        assert_eq!(*method, "NotifyAdd");
        assert_eq!(*object_id, 1001);

        let state = decode(payload);
        assert_eq!(
            state.entity_id,
            Some(bnet::EntityId::from(account.primary_entity_id()))
        );
        let keys: Vec<(u32, u32, u32)> = state
            .field_operation
            .iter()
            .map(|op| (op.field.key.program, op.field.key.group, op.field.key.field))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Program::BNet.as_u32(), 1, 1),
                (Program::BNet.as_u32(), 1, 2),
                (Program::D3.as_u32(), 1, 1),
                (Program::BNet.as_u32(), 1, 4),
            ]
        );
        assert_eq!(state.field_operation[0].field.value.string_value.as_deref(), Some("a@b.com"));
        assert_eq!(state.field_operation[1].field.value.bool_value, Some(true));

        let hero = crate::protocol::d3::EntityId::decode(
            state.field_operation[2].field.value.message_value.as_deref().unwrap(),
        )
        .unwrap();
        assert_eq!(crate::EntityId::from(&hero), toon.game_entity_id());
        let listed = bnet::EntityId::decode(
            state.field_operation[3].field.value.message_value.as_deref().unwrap(),
        )
        .unwrap();
        assert_eq!(crate::EntityId::from(&listed), toon.bnet_entity_id());
    }

    #[tokio::test]
    async fn resubscribing_without_mutation_is_byte_identical() {
        let account = Account::with_persistent_id(2, "same@b.com");
        account.add_toon(Toon::with_persistent_id(1, 2, "One"));
        let notifier = notifier();
        let client = RecordingEndpoint::new(1, false);

        notifier.subscribe(client.clone(), &account).await;
        notifier.subscribe(client.clone(), &account).await;

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2, calls[1].2);
        assert_eq!(notifier.subscriber_count(account.primary_entity_id()), 1);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_subscription_and_other_subscribers() {
        let account = Account::with_persistent_id(3, "c@d.com");
        let notifier = notifier();
        let broken = RecordingEndpoint::new(1, true);
        let healthy = RecordingEndpoint::new(2, false);

        notifier.subscribe(broken.clone(), &account).await;
        notifier.subscribe(healthy.clone(), &account).await;
        assert_eq!(notifier.subscriber_count(account.primary_entity_id()), 2);

        let delivered = notifier.notify_changed(&account).await;
        assert_eq!(delivered, 1);
        assert_eq!(healthy.calls().len(), 2);
    }

    #[tokio::test]
    async fn removing_a_connection_drops_all_its_subscriptions() {
        let a = Account::with_persistent_id(4, "a@x.com");
        let b = Account::with_persistent_id(5, "b@x.com");
        let notifier = notifier();
        let client = RecordingEndpoint::new(9, false);
        let other = RecordingEndpoint::new(10, false);

        notifier.subscribe(client.clone(), &a).await;
        notifier.subscribe(client.clone(), &b).await;
        notifier.subscribe(other.clone(), &b).await;

        let removed = notifier.remove_connection(9);
        assert_eq!(removed, vec![a.primary_entity_id(), b.primary_entity_id()]);
        assert_eq!(notifier.subscriber_count(a.primary_entity_id()), 0);
        assert_eq!(notifier.subscriber_count(b.primary_entity_id()), 1);
        assert!(notifier.subscriptions_of(9).is_empty());
        assert_eq!(notifier.notify_changed(&a).await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_scoped_to_one_entity() {
        let a = Account::with_persistent_id(6, "u@x.com");
        let b = Account::with_persistent_id(7, "v@x.com");
        let notifier = notifier();
        let client = RecordingEndpoint::new(3, false);
        notifier.subscribe(client.clone(), &a).await;
        notifier.subscribe(client.clone(), &b).await;

        assert!(notifier.unsubscribe(3, a.primary_entity_id()));
        assert!(!notifier.unsubscribe(3, a.primary_entity_id()));
        assert_eq!(notifier.subscriptions_of(3), vec![b.primary_entity_id()]);
    }

    #[tokio::test]
    async fn notification_reflects_login() {
        let account = Account::with_persistent_id(8, "login@x.com");
        account.add_toon(Toon::with_persistent_id(2, 8, "Hero"));
        let notifier = notifier();

        let before = notifier.build_add_notification(&account);
        account.bind_session(1);
        let after = notifier.build_add_notification(&account);

        let active = FieldKey::new(Program::D3, 1, 1, 0).to_wire();
        let has_active = |n: &channel::AddNotification| {
            n.channel_state
                .presence
                .as_ref()
                .unwrap()
                .field_operation
                .iter()
                .any(|op| op.field.key == active)
        };
        assert!(!has_active(&before));
        assert!(has_active(&after));
    }
}
