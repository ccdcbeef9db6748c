//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the monitor **requires** the host application to provide.

use crate::domain::{ContextStoreError, HandlerError};
use async_trait::async_trait;
use shared_types::{EventInfo, EventKind, PuRuntime};
use tokio::sync::mpsc;

/// Persistent record of known units, keyed by context path.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the monitor and its handlers share
/// one instance.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Stream every stored context identifier.
    ///
    /// The stream ends with an empty string. Callers stop at the sentinel or
    /// when the channel closes, whichever comes first.
    async fn walk_store(&self) -> Result<mpsc::Receiver<String>, ContextStoreError>;

    /// Raw record stored under `context` (`"/" + id`).
    async fn get_context_info(&self, context: &str) -> Result<Vec<u8>, ContextStoreError>;

    /// Store `data` under `context`, replacing any previous record.
    async fn store_context(&self, context: &str, data: &[u8]) -> Result<(), ContextStoreError>;

    /// Remove the record under `context`. Missing records are not an error.
    async fn remove_context(&self, context: &str) -> Result<(), ContextStoreError>;
}

/// Lifecycle handler for one unit type.
///
/// `start` and `resync` receive the runtime descriptor produced by metadata
/// extraction. The other transitions receive the raw event only.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn create(&self, event: &EventInfo) -> Result<(), HandlerError>;

    async fn start(&self, event: &EventInfo, runtime: &PuRuntime) -> Result<(), HandlerError>;

    async fn stop(&self, event: &EventInfo) -> Result<(), HandlerError>;

    async fn destroy(&self, event: &EventInfo) -> Result<(), HandlerError>;

    async fn pause(&self, _event: &EventInfo) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Re-adopt a unit found in the context store at startup.
    ///
    /// Defaults to `start`. Returning `HandlerError::AlreadyTracked` is
    /// treated as success by the monitor.
    async fn resync(&self, event: &EventInfo, runtime: &PuRuntime) -> Result<(), HandlerError> {
        self.start(event, runtime).await
    }
}

/// Policy side of the enforcer, notified of every unit transition.
#[async_trait]
pub trait PolicyHandler: Send + Sync {
    /// A unit went through `event`.
    async fn handle_pu_event(&self, pu_id: &str, event: EventKind) -> Result<(), HandlerError>;

    /// Runtime information for a unit became available.
    async fn set_pu_runtime(&self, pu_id: &str, runtime: &PuRuntime) -> Result<(), HandlerError>;
}
