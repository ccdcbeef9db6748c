//! Policy handler used by the daemon when no controller is attached: logs
//! every unit transition and keeps the last known runtime per unit.

use async_trait::async_trait;
use pu_monitor::{HandlerError, PolicyHandler};
use shared_types::{EventKind, PuRuntime};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
pub struct LoggingPolicyHandler {
    runtimes: RwLock<HashMap<String, PuRuntime>>,
}

impl LoggingPolicyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn runtime(&self, pu_id: &str) -> Option<PuRuntime> {
        self.runtimes.read().await.get(pu_id).cloned()
    }
}

#[async_trait]
impl PolicyHandler for LoggingPolicyHandler {
    async fn handle_pu_event(&self, pu_id: &str, event: EventKind) -> Result<(), HandlerError> {
        info!(pu_id = %pu_id, event = %event, "Unit transition");
        if event == EventKind::Destroy {
            self.runtimes.write().await.remove(pu_id);
        }
        Ok(())
    }

    async fn set_pu_runtime(&self, pu_id: &str, runtime: &PuRuntime) -> Result<(), HandlerError> {
        self.runtimes
            .write()
            .await
            .insert(pu_id.to_string(), runtime.clone());
        Ok(())
    }
}
