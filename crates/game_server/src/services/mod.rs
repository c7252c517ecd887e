//! Server-side service implementations.
//!
//! Each submodule exposes a `methods()` table for one service; the tables are
//! assembled into the dispatch table under the ids clients expect.

pub mod authentication;
pub mod connection;
pub mod presence;

use crate::{connection::ClientSession, state::ServerState};
use aurora_core::protocol::services::{
    AUTHENTICATION_SERVER, AUTHENTICATION_SERVER_ID, CONNECTION_SERVICE, CONNECTION_SERVICE_ID, PRESENCE_SERVICE,
    PRESENCE_SERVICE_ID,
};
use aurora_core::RpcDispatchTable;
use std::sync::Arc;

/// What every handler gets to work with.
#[derive(Debug, Clone)]
pub struct RpcContext {
    pub state: Arc<ServerState>,
    pub session: Arc<ClientSession>,
}

pub fn build_dispatch_table() -> RpcDispatchTable<RpcContext> {
    let mut table = RpcDispatchTable::new();
    table.register(CONNECTION_SERVICE_ID, &CONNECTION_SERVICE, connection::methods());
    table.register(AUTHENTICATION_SERVER_ID, &AUTHENTICATION_SERVER, authentication::methods());
    table.register(PRESENCE_SERVICE_ID, &PRESENCE_SERVICE, presence::methods());
    table
}
