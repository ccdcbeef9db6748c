//! # HandleEvent Endpoint
//!
//! `Server.HandleEvent` is the only method exposed on the monitor socket.
//! Live events and resync replays both go through [`MonitorServer::process`],
//! so there is one code path for "a unit changed state".

use async_trait::async_trait;
use enforcer_telemetry::{log_unit_event, MONITOR_EVENTS};
use rpc_transport::RpcHandler;
use serde_json::Value;
use shared_types::{EventInfo, EventKind, MonitorResponse, HANDLE_EVENT_METHOD};
use std::sync::Arc;

use crate::domain::{EventDispatcher, MonitorError};

pub struct MonitorServer {
    dispatcher: Arc<EventDispatcher>,
}

impl MonitorServer {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Handle one live lifecycle event.
    ///
    /// # Errors
    ///
    /// - `InvalidEvent` for an empty or unrecognised event type
    /// - `NoHandler` if no processor owns the unit type
    /// - `Metadata` if extraction rejects the event
    /// - `Handler` with the processor's own error
    pub async fn handle_event(&self, event: &EventInfo) -> Result<(), MonitorError> {
        let kind = match event.kind() {
            Ok(kind) => kind,
            Err(e) => {
                MONITOR_EVENTS.with_label_values(&["invalid", "rejected"]).inc();
                return Err(e.into());
            }
        };
        self.process(kind, event).await
    }

    /// Replay a persisted record as a resync of the unit it describes.
    ///
    /// The record must still carry a recognised event type.
    pub async fn replay(&self, record: &EventInfo) -> Result<(), MonitorError> {
        record.kind()?;
        self.process(EventKind::Resync, record).await
    }

    async fn process(&self, kind: EventKind, event: &EventInfo) -> Result<(), MonitorError> {
        let result = self.dispatcher.dispatch_as(kind, event).await;

        let outcome = match &result {
            Ok(()) => "ok",
            Err(MonitorError::Handler(_)) => "handler_error",
            Err(_) => "rejected",
        };
        MONITOR_EVENTS.with_label_values(&[kind.as_str(), outcome]).inc();

        match &result {
            Ok(()) => log_unit_event!(debug, "monitor", "Event handled", event.pu_id, event = %kind),
            Err(e) => log_unit_event!(warn, "monitor", "Event failed", event.pu_id, event = %kind, error = %e),
        }
        result
    }
}

#[async_trait]
impl RpcHandler for MonitorServer {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String> {
        if method != HANDLE_EVENT_METHOD {
            return Err(format!("unknown method: {method}"));
        }

        let event: EventInfo =
            serde_json::from_value(params).map_err(|e| format!("invalid event: {e}"))?;
        self.handle_event(&event).await.map_err(|e| e.to_string())?;

        serde_json::to_value(MonitorResponse::default()).map_err(|e| e.to_string())
    }
}
