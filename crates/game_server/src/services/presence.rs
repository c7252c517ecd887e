//! `bnet.protocol.presence.PresenceService`

use super::RpcContext;
use aurora_core::presence::resolvers::ACTIVE_HERO;
use aurora_core::protocol::bnet::NoData;
use aurora_core::protocol::presence::{
    Field, FieldOperation, OperationType, QueryRequest, QueryResponse, SubscribeRequest, UnsubscribeRequest,
    UpdateRequest,
};
use aurora_core::protocol::services::PRESENCE_SERVICE;
use aurora_core::protocol::d3;
use aurora_core::{
    decode, Account, Addressable, Done, EntityId, EntityKind, FieldKey, MethodTable, PresenceSource, RemoteEndpoint,
    RpcError,
};
use prost::Message;
use std::sync::Arc;
use tracing::{debug, warn};

pub fn methods() -> MethodTable<RpcContext> {
    MethodTable::new(&PRESENCE_SERVICE)
        .method("Subscribe", subscribe)
        .method("Unsubscribe", unsubscribe)
        .method("Update", update)
        .method("Query", query)
}

fn resolve(ctx: &RpcContext, entity_id: EntityId) -> Result<Arc<Account>, RpcError> {
    ctx.state
        .accounts
        .resolve(entity_id)
        .map_err(|e| RpcError::handler(e.to_string()))
}

/// Acknowledges, then pushes the first snapshot under the client's object id.
async fn subscribe(ctx: RpcContext, request: SubscribeRequest, done: Done<NoData>) -> Result<(), RpcError> {
    let account = resolve(&ctx, EntityId::from(&request.entity_id))?;
    ctx.session
        .map_remote_object(account.primary_entity_id(), request.object_id);
    done.complete(&NoData {});

    let endpoint: Arc<dyn RemoteEndpoint> = ctx.session.clone();
    ctx.state.notifier.subscribe(endpoint, &account).await;
    Ok(())
}

async fn unsubscribe(ctx: RpcContext, request: UnsubscribeRequest, done: Done<NoData>) -> Result<(), RpcError> {
    let entity_id = EntityId::from(&request.entity_id);
    let target = ctx
        .state
        .accounts
        .resolve(entity_id)
        .map(|account| account.primary_entity_id())
        .unwrap_or(entity_id);
    if !ctx.state.notifier.unsubscribe(ctx.session.id(), target) {
        debug!(
            "Connection {} was not subscribed to {}",
            ctx.session.id(),
            target
        );
    }
    done.complete(&NoData {});
    Ok(())
}

/// Applies client-side presence changes. Only the hero selection is
/// writable, and only on the account the session is logged into.
async fn update(ctx: RpcContext, request: UpdateRequest, done: Done<NoData>) -> Result<(), RpcError> {
    let account = resolve(&ctx, EntityId::from(&request.entity_id))?;
    let owns_account = ctx
        .session
        .account()
        .is_some_and(|own| own.persistent_id() == account.persistent_id())
        && account.session().map(|binding| binding.connection_id) == Some(ctx.session.id());
    if !owns_account {
        return Err(RpcError::handler(format!(
            "connection {} may not update presence of {}",
            ctx.session.id(),
            account.primary_entity_id()
        )));
    }

    let mut changed = false;
    let mut failure = None;
    for operation in &request.field_operation {
        match apply_operation(&account, operation) {
            Ok(applied) => changed |= applied,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if changed {
        ctx.state.notifier.notify_changed(&account).await;
    }
    match failure {
        Some(e) => Err(e),
        None => {
            done.complete(&NoData {});
            Ok(())
        }
    }
}

/// Returns whether the account changed.
fn apply_operation(account: &Account, operation: &FieldOperation) -> Result<bool, RpcError> {
    let key = FieldKey::from_wire(&operation.field.key);
    if key != ACTIVE_HERO {
        warn!("⚠️ Ignoring update of read-only presence field {}", key);
        return Ok(false);
    }
    if operation.operation == Some(OperationType::Clear as i32) {
        warn!("⚠️ Ignoring clear of {}", key);
        return Ok(false);
    }

    let Some(encoded) = operation.field.value.message_value.as_deref() else {
        return Err(RpcError::handler(format!("{key} update carries no entity id")));
    };
    let hero = EntityId::from(&d3::EntityId::decode(encoded)?);
    let toon_id = match decode(hero) {
        Ok((EntityKind::Toon, id)) => id,
        Ok((kind, _)) => {
            return Err(RpcError::handler(format!("{hero} is a {kind:?}, not a toon")));
        }
        Err(e) => return Err(RpcError::handler(format!("{hero}: {e}"))),
    };

    account
        .select_toon(toon_id)
        .map_err(|e| RpcError::handler(e.to_string()))?;
    debug!("Account {} selected toon {}", account.persistent_id(), toon_id);
    Ok(true)
}

/// Answers the known keys from one view of the account; unknown keys are
/// left out of the response.
async fn query(ctx: RpcContext, request: QueryRequest, done: Done<QueryResponse>) -> Result<(), RpcError> {
    let account = resolve(&ctx, EntityId::from(&request.entity_id))?;
    let directory = ctx.state.notifier.directory();
    let view = account.presence_view();

    let field = request
        .key
        .iter()
        .filter_map(|wire_key| {
            directory
                .query_view(&view, &FieldKey::from_wire(wire_key))
                .map(|value| Field {
                    key: wire_key.clone(),
                    value: value.to_wire(),
                })
        })
        .collect();

    done.complete(&QueryResponse { field });
    Ok(())
}
