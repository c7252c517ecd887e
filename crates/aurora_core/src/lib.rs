//! # Aurora Core
//!
//! Entity addressing, presence synchronization and RPC dispatch for the Aurora
//! login server. Everything here is transport-agnostic; the `game_server`
//! crate supplies sockets, framing and the concrete service handlers.
//!
//! ## Components
//!
//! - [`entity_id`] - composite wire addresses and the kind tags they carry
//! - [`ids`] - durable id allocation seeded from storage
//! - [`presence`] - field keys, per-program resolvers, snapshot delivery
//! - [`rpc`] - service registry and typed method handlers
//! - [`accounts`] - accounts, toons, digests and the in-memory registry
//! - [`store`] - write-through persistence over SQLite
//! - [`protocol`] - protobuf message shapes and service descriptors
//!
//! ## Request Flow
//!
//! 1. A decoded request reaches [`rpc::RpcDispatchTable::dispatch`]
//! 2. The handler reads or mutates an [`accounts::Account`]
//! 3. Subscriptions go through [`presence::SubscriptionNotifier`], which
//!    pushes a full field snapshot back to the client
//! 4. New accounts and toons are written through [`store::AccountStore`]
//!
//! ## Error Handling
//!
//! Malformed keys and unknown methods are logged and ignored. Storage
//! failures are logged and never undo in-memory state. Out-of-range ids and
//! double registrations are bugs and panic.

pub mod accounts;
pub mod entity_id;
pub mod ids;
pub mod presence;
pub mod protocol;
pub mod rpc;
pub mod shutdown;
pub mod store;

pub use accounts::{Account, AccountManager, AccountView, Toon};
pub use entity_id::{decode, encode, Addressable, CodecError, EntityId, EntityKind};
pub use ids::{IdAllocError, PersistentIdAllocator};
pub use presence::{
    DeliveryError, FieldDirectory, FieldKey, FieldOperation, FieldValue, PresenceError,
    PresenceSource, Program, RemoteEndpoint, SubscriptionNotifier,
};
pub use rpc::{DispatchOutcome, Done, MethodTable, Responder, RpcDispatchTable, RpcError};
pub use shutdown::ShutdownState;
pub use store::{AccountStore, RecordKind, SqliteBackend, StorageBackend, StoreError};

/// Notifier specialised for accounts.
pub type AccountNotifier = SubscriptionNotifier<Account>;
