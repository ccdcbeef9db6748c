//! # Monitor Daemon
//!
//! Entry point: telemetry, configuration, monitor, then wait for Ctrl+C.

use anyhow::Result;
use enforcer_telemetry::{init_telemetry, TelemetryConfig};
use monitor_daemon::{DaemonConfig, MonitorDaemon};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and metrics
    let telemetry = TelemetryConfig::for_component("monitor");
    let guard = init_telemetry(&telemetry)?;

    // Load configuration
    let config = DaemonConfig::from_env();

    let daemon = MonitorDaemon::new(config)?;
    daemon.start().await?;

    info!("Monitor is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    daemon.shutdown().await?;
    daemon.write_metrics(guard.metrics())
}
