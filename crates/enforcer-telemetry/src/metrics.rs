//! Prometheus metrics for the control plane.
//!
//! All metrics follow the naming convention: `enforcer_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., calls_total)
//! - **Gauge**: Value that can go up or down (e.g., sessions_active)
//! - **Histogram**: Distribution of values (e.g., call_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSPORT METRICS
    // =========================================================================

    /// Dial attempts towards enforcer sockets
    pub static ref SESSION_DIALS: CounterVec = CounterVec::new(
        Opts::new("enforcer_transport_dials_total", "Dial attempts towards enforcer sockets"),
        &["outcome"]  // outcome: connected/retry/exhausted
    ).expect("metric creation failed");

    /// Currently registered sessions
    pub static ref SESSIONS_ACTIVE: Gauge = Gauge::new(
        "enforcer_transport_sessions_active",
        "Number of live authenticated sessions"
    ).expect("metric creation failed");

    /// Outbound calls
    pub static ref RPC_CALLS: CounterVec = CounterVec::new(
        Opts::new("enforcer_transport_calls_total", "Outbound calls by method"),
        &["method", "outcome"]  // outcome: ok/error
    ).expect("metric creation failed");

    /// Outbound call latency
    pub static ref RPC_CALL_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "enforcer_transport_call_duration_seconds",
            "Round trip time of outbound calls"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid bucket layout"))
    ).expect("metric creation failed");

    /// Requests rejected because their integrity tag did not verify
    pub static ref INTEGRITY_FAILURES: Counter = Counter::new(
        "enforcer_transport_integrity_failures_total",
        "Requests rejected on integrity tag mismatch"
    ).expect("metric creation failed");

    // =========================================================================
    // MONITOR METRICS
    // =========================================================================

    /// Lifecycle events handled by the monitor
    pub static ref MONITOR_EVENTS: CounterVec = CounterVec::new(
        Opts::new("enforcer_monitor_events_total", "Lifecycle events handled by the monitor"),
        &["event_type", "outcome"]  // outcome: ok/rejected/handler_error
    ).expect("metric creation failed");

    /// Context store records visited during resync
    pub static ref RESYNC_RECORDS: CounterVec = CounterVec::new(
        Opts::new("enforcer_monitor_resync_records_total", "Records visited during resync"),
        &["outcome"]  // outcome: replayed/unreadable/undecodable/rejected
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Encode all registered metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Transport
        Box::new(SESSION_DIALS.clone()),
        Box::new(SESSIONS_ACTIVE.clone()),
        Box::new(RPC_CALLS.clone()),
        Box::new(RPC_CALL_DURATION.clone()),
        Box::new(INTEGRITY_FAILURES.clone()),
        // Monitor
        Box::new(MONITOR_EVENTS.clone()),
        Box::new(RESYNC_RECORDS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
