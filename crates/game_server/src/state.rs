//! State shared by every connection task.

use crate::{config::ServerConfig, connection::ConnectionManager, services::RpcContext};
use aurora_core::presence::account_directory;
use aurora_core::{AccountManager, AccountNotifier, AccountStore, RpcDispatchTable};
use std::sync::Arc;

pub struct ServerState {
    pub config: ServerConfig,
    pub accounts: Arc<AccountManager>,
    pub notifier: Arc<AccountNotifier>,
    pub dispatch: Arc<RpcDispatchTable<RpcContext>>,
    pub connections: Arc<ConnectionManager>,
}

impl ServerState {
    pub fn new(config: ServerConfig, store: AccountStore) -> Self {
        Self {
            config,
            accounts: Arc::new(AccountManager::new(store)),
            notifier: Arc::new(AccountNotifier::new(Arc::new(account_directory()))),
            dispatch: Arc::new(crate::services::build_dispatch_table()),
            connections: Arc::new(ConnectionManager::new()),
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("bind_address", &self.config.bind_address)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}
