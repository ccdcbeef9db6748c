//! # Transport Errors

use std::io;
use thiserror::Error;

/// Errors surfaced by sessions, calls and the serving side.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid construction or serving parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dialing failed on every attempt; carries the last dial error.
    #[error("Failed to connect to {path} after {attempts} attempts: {source}")]
    Connection {
        path: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// A live session already exists for this context.
    #[error("Context already connected: {0}")]
    AlreadyConnected(String),

    /// No live session for this context.
    #[error("Context not found: {0}")]
    NotFound(String),

    /// The integrity tag did not verify against the session secret.
    #[error("Integrity check failed: request tag does not match")]
    Integrity,

    /// A live listener already answers on the bind path.
    #[error("Address in use: {0}")]
    AddressInUse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer closed the connection before replying.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Reply id did not match the outstanding call.
    #[error("Unexpected reply id: expected {expected}, got {got}")]
    UnexpectedReply { expected: u64, got: u64 },

    /// Call-level error reported by the remote handler.
    #[error("{0}")]
    Remote(String),
}
