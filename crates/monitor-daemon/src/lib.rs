//! # Monitor Daemon
//!
//! Wires the lifecycle monitor for Linux-process units.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from env)
//! 2. Create the context store directory
//! 3. Register the process tracker
//! 4. Start the monitor (bind, resync, accept)

pub mod config;
pub mod policy;

pub use config::{ConfigError, DaemonConfig};
pub use policy::LoggingPolicyHandler;

use anyhow::{Context, Result};
use enforcer_telemetry::MetricsHandle;
use pu_monitor::{ContextStore, DirContextStore, PolicyHandler, ProcessTracker, RpcMonitor};
use shared_types::PuType;
use std::sync::Arc;
use tracing::info;

/// The running daemon.
pub struct MonitorDaemon {
    config: DaemonConfig,
    monitor: RpcMonitor,
    tracker: Arc<ProcessTracker>,
}

impl MonitorDaemon {
    /// Build the daemon with the default logging policy handler.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        Self::with_policy(config, Arc::new(LoggingPolicyHandler::new()))
    }

    pub fn with_policy(config: DaemonConfig, policy: Arc<dyn PolicyHandler>) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.store_dir).with_context(|| {
            format!(
                "failed to create context store {}",
                config.store_dir.display()
            )
        })?;
        let store: Arc<dyn ContextStore> = Arc::new(DirContextStore::new(&config.store_dir));

        let monitor = RpcMonitor::new(config.rpc_address.clone(), Some(policy), None, Arc::clone(&store))?;
        let tracker = Arc::new(ProcessTracker::new(monitor.policy_handler(), store));
        monitor.register_processor(PuType::LinuxProcess, tracker.clone())?;

        Ok(Self {
            config,
            monitor,
            tracker,
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn tracker(&self) -> Arc<ProcessTracker> {
        Arc::clone(&self.tracker)
    }

    pub async fn start(&self) -> Result<()> {
        self.monitor
            .start()
            .await
            .with_context(|| format!("failed to start monitor on {}", self.config.rpc_address))?;
        info!(
            socket = %self.config.rpc_address,
            store = %self.config.store_dir.display(),
            tracked = self.tracker.len(),
            "Monitor daemon ready"
        );
        Ok(())
    }

    /// Write the metrics snapshot to the configured file, if any.
    pub fn write_metrics(&self, metrics: &MetricsHandle) -> Result<()> {
        let Some(path) = &self.config.metrics_file else {
            return Ok(());
        };
        let text = metrics.encode()?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Metrics written");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        self.monitor.stop().await?;
        info!("Shutdown complete");
        Ok(())
    }
}
