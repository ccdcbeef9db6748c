//! # Domain Errors

use rpc_transport::TransportError;
use shared_types::{PuType, TypeError};
use std::io;
use thiserror::Error;

/// Failure reported by a unit-type handler.
///
/// Surfaced to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The unit is already known. Resync treats this as success.
    #[error("unit already tracked: {0}")]
    AlreadyTracked(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Monitor error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invalid construction parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Empty or unrecognised event type.
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] TypeError),

    /// Event type is valid but nothing handles this unit type.
    #[error("No processor registered for unit type {0}")]
    NoHandler(PuType),

    #[error("Processor already registered for unit type {0}")]
    AlreadyRegistered(PuType),

    /// Metadata extraction rejected the event.
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    /// The handler's own failure.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("Monitor already started")]
    AlreadyStarted,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Context store errors.
#[derive(Debug, Error)]
pub enum ContextStoreError {
    #[error("Context not found: {0}")]
    NotFound(String),

    /// Context path that cannot name a single store entry.
    #[error("Invalid context path: {0:?}")]
    InvalidContext(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),
}
