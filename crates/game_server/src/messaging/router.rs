//! Routes framed requests into the RPC dispatch table.

use crate::{connection::ClientSession, messaging::Packet, services::RpcContext, state::ServerState};
use aurora_core::{DispatchOutcome, Responder};
use std::sync::Arc;
use tracing::{trace, warn};

/// Dispatches one inbound packet on behalf of `session`.
///
/// Responses to our own outbound calls carry no work for the server and are
/// dropped. Requests for unknown services or methods are logged and get no
/// reply; the connection stays open either way.
pub async fn route_packet(state: &Arc<ServerState>, session: &Arc<ClientSession>, packet: Packet) -> DispatchOutcome {
    let header = packet.header;
    if header.is_response() {
        trace!(
            "📨 Connection {} acknowledged outbound request {}",
            session.id(),
            header.request_id
        );
        return DispatchOutcome::Handled;
    }

    let service_id = u32::from(header.service_id);
    let Some(method_name) = state.dispatch.resolve_method_name(service_id, header.method_id) else {
        let outcome = if state.dispatch.service(service_id).is_some() {
            DispatchOutcome::UnknownMethod
        } else {
            DispatchOutcome::UnknownService
        };
        warn!(
            "⚠️ Connection {} called unknown method {:#x}/{} (request {})",
            session.id(),
            service_id,
            header.method_id,
            header.request_id
        );
        return outcome;
    };

    let responder = {
        let session = Arc::clone(session);
        let request_id = header.request_id;
        Responder::new(move |payload| session.send_response(request_id, payload))
    };
    let ctx = RpcContext {
        state: Arc::clone(state),
        session: Arc::clone(session),
    };

    state
        .dispatch
        .dispatch(service_id, method_name, &packet.payload, ctx, responder)
        .await
}
