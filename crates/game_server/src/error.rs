//! Error types for server startup and connection handling.

use crate::messaging::FrameError;
use aurora_core::StoreError;

/// Enumeration of possible server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding, accepting, reading or writing sockets
    #[error("Network error: {0}")]
    Network(String),

    /// Unrecoverable protocol violation on a connection
    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// Opening or loading the account database
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
