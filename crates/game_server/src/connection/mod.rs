//! Connection management for client sessions.
//!
//! This module tracks open sockets and the protocol state bound to each of
//! them: exported services, object ids and the logged-in account.

pub mod client;
pub mod manager;

pub use client::ClientSession;
pub use manager::ConnectionManager;

/// Type alias for connection identifiers.
///
/// Connection ids double as the subscriber key in presence notifications.
pub type ConnectionId = u64;
