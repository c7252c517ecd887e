//! # Game Server - Login and Presence Front End
//!
//! Serves the Battle.net-style RPC protocol over TCP: clients connect, bind
//! services, log on with an email address and subscribe to the presence of
//! accounts. The account model, presence resolution and dispatch machinery
//! live in `aurora_core`; this crate supplies sockets, framing, sessions and
//! the concrete service handlers.
//!
//! ## Architecture Overview
//!
//! * **Connection Manager** - tracks live [`connection::ClientSession`]s
//! * **Messaging** - packet framing and routing into the dispatch table
//! * **Services** - `ConnectionService`, `AuthenticationServer` and
//!   `PresenceService` handlers
//! * **Server** - accept loop, per-connection tasks and graceful shutdown
//!
//! ### Request Flow
//!
//! 1. Bytes from a socket are framed into packets
//! 2. The header's service and method ids select a handler
//! 3. The handler decodes its protobuf request and optionally completes a
//!    response, which is queued back to the same connection
//! 4. Presence changes are pushed to every subscribed connection as
//!    `ChannelSubscriber.NotifyAdd` calls
//!
//! ## Quick Start
//!
//! ```no_run
//! use game_server::{create_server_with_config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = create_server_with_config(ServerConfig::default())?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

// Re-export core types and functions
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::GameServer;
pub use state::ServerState;
pub use utils::{create_in_memory_server, create_server, create_server_with_config};

// Public modules
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod server;
pub mod services;
pub mod state;
pub mod utils;
