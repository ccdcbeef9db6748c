//! # Enforcer Telemetry
//!
//! Logging and metrics shared by the transport, the monitor and the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use enforcer_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::for_component("monitor");
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ENFORCER_SERVICE_NAME` | `enforcer` | Service name in logs |
//! | `ENFORCER_LOG_LEVEL` | `info` | Log level filter |
//! | `ENFORCER_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `ENFORCER_JSON_LOGS` | `false` | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    register_metrics, MetricsHandle, INTEGRITY_FAILURES, MONITOR_EVENTS,
    RESYNC_RECORDS, RPC_CALLS, RPC_CALL_DURATION, SESSIONS_ACTIVE, SESSION_DIALS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;

    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered by this guard.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
