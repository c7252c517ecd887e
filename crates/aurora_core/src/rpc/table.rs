use super::handler::{Done, MethodHandler, Responder, TypedMethod};
use super::{DispatchOutcome, RpcError};
use crate::protocol::ServiceDescriptor;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

/// Handlers of one service, keyed by method name.
pub struct MethodTable<C> {
    descriptor: &'static ServiceDescriptor,
    methods: HashMap<&'static str, Arc<dyn MethodHandler<C>>>,
}

impl<C: Send + 'static> MethodTable<C> {
    pub fn new(descriptor: &'static ServiceDescriptor) -> Self {
        Self {
            descriptor,
            methods: HashMap::new(),
        }
    }

    /// Registers a typed handler for `name`.
    ///
    /// # Panics
    ///
    /// Panics if the service descriptor has no such method or the method is
    /// already registered.
    pub fn method<Req, Resp, F, Fut>(self, name: &str, handler: F) -> Self
    where
        Req: prost::Message + Default + 'static,
        Resp: prost::Message + 'static,
        F: Fn(C, Req, Done<Resp>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send,
    {
        self.handler(name, Arc::new(TypedMethod::new(handler)))
    }

    /// Registers an already boxed handler.
    pub fn handler(mut self, name: &str, handler: Arc<dyn MethodHandler<C>>) -> Self {
        let Some(method) = self.descriptor.method_by_name(name) else {
            panic!("{} does not declare method {}", self.descriptor.name, name);
        };
        if self.methods.insert(method.name, handler).is_some() {
            panic!("{}.{} registered twice", self.descriptor.name, name);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A service as registered under a numeric id.
pub struct ServiceRegistration<C> {
    pub id: u32,
    pub descriptor: &'static ServiceDescriptor,
    methods: HashMap<&'static str, Arc<dyn MethodHandler<C>>>,
}

impl<C> ServiceRegistration<C> {
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn handles(&self, method_name: &str) -> bool {
        self.methods.contains_key(method_name)
    }
}

/// Service id -> method name -> handler. Immutable once built.
pub struct RpcDispatchTable<C> {
    services: HashMap<u32, ServiceRegistration<C>>,
}

impl<C: Send + 'static> Default for RpcDispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> RpcDispatchTable<C> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Adds a service.
    ///
    /// # Panics
    ///
    /// Panics when `id` is already taken or `methods` was built for a
    /// different descriptor.
    pub fn register(&mut self, id: u32, descriptor: &'static ServiceDescriptor, methods: MethodTable<C>) {
        assert!(
            std::ptr::eq(descriptor, methods.descriptor),
            "method table for {} registered as {}",
            methods.descriptor.name,
            descriptor.name
        );
        if self.services.contains_key(&id) {
            panic!("service id {:#x} registered twice ({})", id, descriptor.name);
        }
        self.services.insert(
            id,
            ServiceRegistration {
                id,
                descriptor,
                methods: methods.methods,
            },
        );
    }

    pub fn service(&self, id: u32) -> Option<&ServiceRegistration<C>> {
        self.services.get(&id)
    }

    /// Translates a wire method id to its name.
    pub fn resolve_method_name(&self, service_id: u32, method_id: u32) -> Option<&'static str> {
        let service = self.services.get(&service_id)?;
        service.descriptor.method_by_id(method_id).map(|m| m.name)
    }

    /// Finds the id a service was registered under by its name hash.
    pub fn service_id_by_hash(&self, hash: u32) -> Option<u32> {
        self.services
            .values()
            .find(|s| s.descriptor.hash() == hash)
            .map(|s| s.id)
    }

    /// Routes one request. Never fails; problems are logged and reported
    /// through the outcome.
    pub async fn dispatch(
        &self,
        service_id: u32,
        method_name: &str,
        payload: &[u8],
        ctx: C,
        responder: Responder,
    ) -> DispatchOutcome {
        let Some(service) = self.services.get(&service_id) else {
            warn!(
                "⚠️ Dropping call to unknown service {:#x} (method {})",
                service_id, method_name
            );
            return DispatchOutcome::UnknownService;
        };
        let Some(handler) = service.methods.get(method_name) else {
            warn!(
                "⚠️ Dropping call to unknown method {}.{}",
                service.descriptor.name, method_name
            );
            return DispatchOutcome::UnknownMethod;
        };

        trace!("➡️ {}.{} ({} bytes)", service.descriptor.name, method_name, payload.len());
        match handler.invoke(ctx, payload, responder).await {
            Ok(()) => DispatchOutcome::Handled,
            Err(RpcError::Decode(e)) => {
                warn!(
                    "⚠️ Malformed {} for {}.{}: {}",
                    handler.request_type(),
                    service.descriptor.name,
                    method_name,
                    e
                );
                DispatchOutcome::MalformedRequest
            }
            Err(e) => {
                warn!("⚠️ {}.{} failed: {}", service.descriptor.name, method_name, e);
                DispatchOutcome::HandlerFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::bnet::{EntityId, NoData};
    use crate::protocol::services::{PRESENCE_SERVICE, PRESENCE_SERVICE_ID};
    use prost::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Calls = Arc<AtomicUsize>;

    fn table() -> RpcDispatchTable<Calls> {
        let mut table = RpcDispatchTable::new();
        table.register(
            PRESENCE_SERVICE_ID,
            &PRESENCE_SERVICE,
            MethodTable::new(&PRESENCE_SERVICE)
                .method("Query", |calls: Calls, _: EntityId, done: Done<NoData>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    done.complete(&NoData {});
                    Ok(())
                })
                .method("Update", |_: Calls, _: EntityId, _: Done<NoData>| async move {
                    Err(RpcError::handler("update rejected"))
                }),
        );
        table
    }

    #[tokio::test]
    async fn known_method_is_invoked_with_responder() {
        let table = table();
        let calls = Calls::default();
        let responded = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&responded);
        let payload = EntityId { high: 1, low: 2 }.encode_to_vec();

        let outcome = table
            .dispatch(
                PRESENCE_SERVICE_ID,
                "Query",
                &payload,
                Arc::clone(&calls),
                Responder::new(move |_| {
                    flag.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(responded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_service_and_method_invoke_nothing() {
        let table = table();
        let calls = Calls::default();

        let outcome = table
            .dispatch(0x42, "Query", &[], Arc::clone(&calls), Responder::noop())
            .await;
        assert_eq!(outcome, DispatchOutcome::UnknownService);

        let outcome = table
            .dispatch(PRESENCE_SERVICE_ID, "Teleport", &[], Arc::clone(&calls), Responder::noop())
            .await;
        assert_eq!(outcome, DispatchOutcome::UnknownMethod);

        // Declared by the descriptor but without a registered handler.
        let outcome = table
            .dispatch(PRESENCE_SERVICE_ID, "Subscribe", &[], Arc::clone(&calls), Responder::noop())
            .await;
        assert_eq!(outcome, DispatchOutcome::UnknownMethod);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_and_failing_requests_are_reported() {
        let table = table();
        let calls = Calls::default();
        let outcome = table
            .dispatch(PRESENCE_SERVICE_ID, "Query", &[0x09, 0x01], Arc::clone(&calls), Responder::noop())
            .await;
        assert_eq!(outcome, DispatchOutcome::MalformedRequest);

        let outcome = table
            .dispatch(PRESENCE_SERVICE_ID, "Update", &[], Arc::clone(&calls), Responder::noop())
            .await;
        assert_eq!(outcome, DispatchOutcome::HandlerFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn method_ids_and_hashes_resolve() {
        let table = table();
        assert_eq!(table.resolve_method_name(PRESENCE_SERVICE_ID, 4), Some("Query"));
        assert_eq!(table.resolve_method_name(PRESENCE_SERVICE_ID, 99), None);
        assert_eq!(table.service_id_by_hash(PRESENCE_SERVICE.hash()), Some(PRESENCE_SERVICE_ID));
        assert_eq!(table.service_id_by_hash(0), None);
        assert!(table.service(PRESENCE_SERVICE_ID).unwrap().handles("Query"));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_service_id_panics() {
        let mut table = table();
        table.register(PRESENCE_SERVICE_ID, &PRESENCE_SERVICE, MethodTable::new(&PRESENCE_SERVICE));
    }

    #[test]
    #[should_panic(expected = "does not declare method")]
    fn undeclared_method_panics() {
        let _ = MethodTable::<Calls>::new(&PRESENCE_SERVICE).method(
            "Teleport",
            |_: Calls, _: EntityId, _: Done<NoData>| async move { Ok(()) },
        );
    }
}
