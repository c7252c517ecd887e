//! # RPC Dispatch
//!
//! Maps a numeric service id and a method name to a handler. Tables are
//! built once at startup and then shared read-only; dispatch needs no locks.
//!
//! Unknown services, unknown methods and undecodable requests are logged and
//! dropped without a response. They never fail the connection.
//!
//! ```rust,ignore
//! let mut table = RpcDispatchTable::new();
//! table.register(
//!     AUTHENTICATION_SERVER_ID,
//!     &AUTHENTICATION_SERVER,
//!     MethodTable::new(&AUTHENTICATION_SERVER)
//!         .method("Logon", |ctx: Ctx, req: LogonRequest, done: Done<LogonResponse>| async move {
//!             done.complete(&logon(ctx, req).await?);
//!             Ok(())
//!         }),
//! );
//! ```

mod handler;
mod table;

pub use handler::{Done, MethodHandler, Responder, TypedMethod};
pub use table::{MethodTable, RpcDispatchTable, ServiceRegistration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to decode request: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("{0}")]
    Handler(String),
}

impl RpcError {
    pub fn handler(message: impl Into<String>) -> Self {
        RpcError::Handler(message.into())
    }
}

/// What happened to a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    UnknownService,
    UnknownMethod,
    MalformedRequest,
    /// The handler ran and reported an error.
    HandlerFailed,
}
