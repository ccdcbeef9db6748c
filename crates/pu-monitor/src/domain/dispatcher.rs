//! # Event Dispatcher
//!
//! Dispatch table from unit type to lifecycle handler.
//!
//! ## Rules
//!
//! - One handler per unit type. A second registration fails; nothing is
//!   silently replaced.
//! - An event is rejected before any handler runs when its type is empty or
//!   unrecognised, or when no handler owns its unit type. The two failures
//!   are distinct errors.
//! - `start`, `unpause` and `resync` run metadata extraction first.
//! - Handler errors come back unchanged.

use parking_lot::RwLock;
use shared_types::{EventInfo, EventKind, PuType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::metadata::{default_extractor, MetadataExtractor};
use super::{HandlerError, MonitorError};
use crate::ports::EventHandler;

pub struct EventDispatcher {
    handlers: RwLock<HashMap<PuType, Arc<dyn EventHandler>>>,
    extractor: MetadataExtractor,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EventDispatcher {
    /// Create an empty table. `None` selects the default metadata extractor.
    pub fn new(extractor: Option<MetadataExtractor>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            extractor: extractor.unwrap_or_else(default_extractor),
        }
    }

    /// Register the handler for `pu_type`.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if `pu_type` already has a handler.
    pub fn register(
        &self,
        pu_type: PuType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), MonitorError> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&pu_type) {
            return Err(MonitorError::AlreadyRegistered(pu_type));
        }
        handlers.insert(pu_type, handler);
        info!(pu_type = %pu_type, "Registered processor");
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, pu_type: PuType) -> bool {
        self.handlers.read().contains_key(&pu_type)
    }

    pub fn registered_types(&self) -> Vec<PuType> {
        self.handlers.read().keys().copied().collect()
    }

    fn handler_for(&self, pu_type: PuType) -> Result<Arc<dyn EventHandler>, MonitorError> {
        self.handlers
            .read()
            .get(&pu_type)
            .cloned()
            .ok_or(MonitorError::NoHandler(pu_type))
    }

    /// Validate `event` and route it by its own event type.
    pub async fn dispatch(&self, event: &EventInfo) -> Result<(), MonitorError> {
        let kind = event.kind()?;
        self.dispatch_as(kind, event).await
    }

    /// Route `event` to the `kind` capability of its unit type's handler.
    ///
    /// The event itself is passed through untouched, so a persisted record
    /// replayed as `Resync` keeps its original fields.
    pub async fn dispatch_as(&self, kind: EventKind, event: &EventInfo) -> Result<(), MonitorError> {
        let handler = self.handler_for(event.pu_type)?;
        debug!(pu_id = %event.pu_id, event = %kind, pu_type = %event.pu_type, "Dispatching event");

        match kind {
            EventKind::Create => handler.create(event).await?,
            EventKind::Start | EventKind::Unpause => {
                let runtime = (self.extractor)(event)?;
                handler.start(event, &runtime).await?;
            }
            EventKind::Stop => handler.stop(event).await?,
            EventKind::Destroy => handler.destroy(event).await?,
            EventKind::Pause => handler.pause(event).await?,
            EventKind::Resync => {
                let runtime = (self.extractor)(event)?;
                match handler.resync(event, &runtime).await {
                    Ok(()) | Err(HandlerError::AlreadyTracked(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(())
    }
}
