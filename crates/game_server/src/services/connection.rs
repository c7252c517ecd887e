//! `bnet.protocol.connection.ConnectionService`

use super::RpcContext;
use aurora_core::protocol::bnet::ProcessId;
use aurora_core::protocol::connection::{BindRequest, BindResponse, ConnectRequest, ConnectResponse};
use aurora_core::protocol::services::CONNECTION_SERVICE;
use aurora_core::{Done, MethodTable, RpcError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Label the server identifies itself with in `ConnectResponse.server_id`.
pub const SERVER_PROCESS_LABEL: u32 = 3_868_510_373;

/// Id returned for an imported hash the server does not implement.
pub const UNBOUND_SERVICE_ID: u32 = 0xFF;

pub fn methods() -> MethodTable<RpcContext> {
    MethodTable::new(&CONNECTION_SERVICE)
        .method("Connect", connect)
        .method("Bind", bind)
}

async fn connect(ctx: RpcContext, request: ConnectRequest, done: Done<ConnectResponse>) -> Result<(), RpcError> {
    let bind_response = request
        .bind_request
        .as_ref()
        .map(|bind_request| apply_bind(&ctx, bind_request));

    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default();
    info!("🤝 Connection {} completed handshake", ctx.session.id());

    done.complete(&ConnectResponse {
        server_id: ProcessId {
            label: SERVER_PROCESS_LABEL,
            epoch,
        },
        client_id: request.client_id,
        bind_result: Some(0),
        bind_response,
    });
    Ok(())
}

async fn bind(ctx: RpcContext, request: BindRequest, done: Done<BindResponse>) -> Result<(), RpcError> {
    let response = apply_bind(&ctx, &request);
    done.complete(&response);
    Ok(())
}

/// Records the client's exports and resolves its imports.
fn apply_bind(ctx: &RpcContext, request: &BindRequest) -> BindResponse {
    for service in &request.exported_service {
        ctx.session.export_service(service.hash, service.id);
        debug!(
            "Connection {} exported {:#010x} as {}",
            ctx.session.id(),
            service.hash,
            service.id
        );
    }

    let imported_service_id = request
        .imported_service_hash
        .iter()
        .map(|hash| {
            ctx.state.dispatch.service_id_by_hash(*hash).unwrap_or_else(|| {
                debug!(
                    "Connection {} imported unknown service {:#010x}",
                    ctx.session.id(),
                    hash
                );
                UNBOUND_SERVICE_ID
            })
        })
        .collect();

    BindResponse { imported_service_id }
}
