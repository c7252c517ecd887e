//! Server lifecycle and per-connection handling.

pub mod core;
pub mod handlers;

pub use self::core::GameServer;
pub use handlers::{handle_connection, release_connection};
