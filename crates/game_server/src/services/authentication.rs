//! `bnet.protocol.authentication.AuthenticationServer`

use super::RpcContext;
use aurora_core::protocol::authentication::{LogonRequest, LogonResponse, ModuleMessageRequest};
use aurora_core::protocol::bnet::{self, NoData};
use aurora_core::protocol::services::AUTHENTICATION_SERVER;
use aurora_core::{Addressable, Done, MethodTable, RpcError};
use std::sync::Arc;
use tracing::{debug, info};

pub fn methods() -> MethodTable<RpcContext> {
    MethodTable::new(&AUTHENTICATION_SERVER)
        .method("Logon", logon)
        .method("ModuleMessage", module_message)
}

/// Finds or creates the account for the email and binds it to the session.
async fn logon(ctx: RpcContext, request: LogonRequest, done: Done<LogonResponse>) -> Result<(), RpcError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| RpcError::handler("logon request carries no email"))?;

    let (account, created) = ctx
        .state
        .accounts
        .find_or_create(email)
        .await
        .map_err(|e| RpcError::handler(format!("cannot create account for {email}: {e}")))?;

    let connection_id = ctx.session.id();
    if let Some(previous) = ctx.session.bind_account(Arc::clone(&account)) {
        if previous.persistent_id() != account.persistent_id() && previous.clear_session(connection_id) {
            ctx.state.notifier.notify_changed(&previous).await;
        }
    }
    if let Some(displaced) = account.bind_session(connection_id) {
        if let Some(previous) = ctx.state.connections.get(displaced).await {
            previous.release_account(account.persistent_id());
        }
        info!(
            "🔐 Account {} moved from connection {} to {}",
            account.persistent_id(),
            displaced,
            connection_id
        );
    }
    info!(
        "🔐 Connection {} logged in as {} (account {}{})",
        connection_id,
        account.email(),
        account.persistent_id(),
        if created { ", new" } else { "" }
    );

    done.complete(&LogonResponse {
        account: bnet::EntityId::from(account.primary_entity_id()),
        game_account: bnet::EntityId::from(account.game_account_id()),
    });

    ctx.state.notifier.notify_changed(&account).await;
    Ok(())
}

async fn module_message(ctx: RpcContext, request: ModuleMessageRequest, done: Done<NoData>) -> Result<(), RpcError> {
    debug!(
        "Connection {} sent module message for module {} ({} bytes)",
        ctx.session.id(),
        request.module_id,
        request.message.as_ref().map_or(0, Vec::len)
    );
    done.complete(&NoData {});
    Ok(())
}
