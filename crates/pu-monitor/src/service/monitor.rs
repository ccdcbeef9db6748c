//! # RPC Monitor
//!
//! Owns the monitor socket, the dispatch table and the context store.
//!
//! ```text
//! [Created] ──start()──→ [Started] ──stop()──→ [Stopped]
//! ```
//!
//! - `start` binds, resyncs, then spawns the accept loop. A second `start`,
//!   or a `start` after `stop`, fails with `AlreadyStarted`.
//! - `stop` on a monitor that is not running is a no-op.

use enforcer_telemetry::RESYNC_RECORDS;
use rpc_transport::{RpcHandler, RpcServer, TransportError};
use shared_types::{EventInfo, PuType};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::server::MonitorServer;
use crate::domain::{EventDispatcher, MetadataExtractor, MonitorError};
use crate::ports::{ContextStore, EventHandler, PolicyHandler};

enum MonitorState {
    Created,
    Started {
        shutdown: watch::Sender<bool>,
        task: JoinHandle<Result<(), TransportError>>,
    },
    Stopped,
}

/// Outcome of one resync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Records handed to a handler successfully.
    pub replayed: usize,
    /// Records that could not be read, decoded or dispatched.
    pub skipped: usize,
}

pub struct RpcMonitor {
    rpc_address: String,
    policy_handler: Arc<dyn PolicyHandler>,
    dispatcher: Arc<EventDispatcher>,
    server: Arc<MonitorServer>,
    store: Arc<dyn ContextStore>,
    state: Mutex<MonitorState>,
}

impl RpcMonitor {
    /// Create a monitor listening on the unix socket `rpc_address`.
    ///
    /// `extractor` replaces the default metadata extraction when given.
    ///
    /// # Errors
    ///
    /// `Configuration` if the address is empty or no policy handler is given.
    pub fn new(
        rpc_address: impl Into<String>,
        policy_handler: Option<Arc<dyn PolicyHandler>>,
        extractor: Option<MetadataExtractor>,
        store: Arc<dyn ContextStore>,
    ) -> Result<Self, MonitorError> {
        let rpc_address = rpc_address.into();
        if rpc_address.is_empty() {
            return Err(MonitorError::Configuration(
                "RPC address must not be empty".to_string(),
            ));
        }
        let policy_handler = policy_handler.ok_or_else(|| {
            MonitorError::Configuration("a policy handler is required".to_string())
        })?;

        let dispatcher = Arc::new(EventDispatcher::new(extractor));
        let server = Arc::new(MonitorServer::new(Arc::clone(&dispatcher)));

        Ok(Self {
            rpc_address,
            policy_handler,
            dispatcher,
            server,
            store,
            state: Mutex::new(MonitorState::Created),
        })
    }

    pub fn rpc_address(&self) -> &str {
        &self.rpc_address
    }

    /// Policy handler given at construction, for processors to forward to.
    pub fn policy_handler(&self) -> Arc<dyn PolicyHandler> {
        Arc::clone(&self.policy_handler)
    }

    /// The `Server.HandleEvent` endpoint, for in-process callers.
    pub fn server(&self) -> Arc<MonitorServer> {
        Arc::clone(&self.server)
    }

    /// Register the processor for `pu_type`.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if the type already has a processor.
    pub fn register_processor(
        &self,
        pu_type: PuType,
        processor: Arc<dyn EventHandler>,
    ) -> Result<(), MonitorError> {
        self.dispatcher.register(pu_type, processor)
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, MonitorState::Started { .. })
    }

    /// Bind the socket, resync from the context store, then start accepting.
    ///
    /// Resync failures never fail `start`.
    ///
    /// # Errors
    ///
    /// - `AlreadyStarted` unless the monitor is freshly created
    /// - `Transport` if the socket cannot be bound (e.g. `AddressInUse`)
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, MonitorState::Created) {
            return Err(MonitorError::AlreadyStarted);
        }

        let listener = RpcServer::bind(&self.rpc_address).await?;

        let report = self.resync().await;
        info!(
            replayed = report.replayed,
            skipped = report.skipped,
            "Resync complete"
        );

        let (shutdown, rx) = watch::channel(false);
        let handler: Arc<dyn RpcHandler> = self.server();
        let task = tokio::spawn(listener.serve(handler, rx));

        *state = MonitorState::Started { shutdown, task };
        info!(socket = %self.rpc_address, "Monitor started");
        Ok(())
    }

    /// Stop accepting and release the socket.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut state = self.state.lock().await;
        let (shutdown, task) = match std::mem::replace(&mut *state, MonitorState::Stopped) {
            MonitorState::Started { shutdown, task } => (shutdown, task),
            MonitorState::Created => {
                // never started; keep it startable
                *state = MonitorState::Created;
                debug!("Stop before start ignored");
                return Ok(());
            }
            MonitorState::Stopped => {
                debug!("Stop on a stopped monitor ignored");
                return Ok(());
            }
        };

        let _ = shutdown.send(true);
        match task.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "Serve task ended abnormally"),
        }

        info!(socket = %self.rpc_address, "Monitor stopped");
        Ok(())
    }

    /// Replay every record in the context store.
    ///
    /// Never fails: an unreachable store, an unreadable or undecodable record
    /// and a record the handler rejects are logged and skipped.
    pub async fn resync(&self) -> ResyncReport {
        let mut report = ResyncReport::default();

        let mut contexts = match self.store.walk_store().await {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(error = %e, "Context store walk failed, skipping resync");
                return report;
            }
        };

        while let Some(context) = contexts.recv().await {
            if context.is_empty() {
                break;
            }
            let path = format!("/{}", context.trim_start_matches('/'));

            let data = match self.store.get_context_info(&path).await {
                Ok(data) => data,
                Err(e) => {
                    RESYNC_RECORDS.with_label_values(&["unreadable"]).inc();
                    warn!(context = %path, error = %e, "Skipping unreadable context");
                    report.skipped += 1;
                    continue;
                }
            };

            let record: EventInfo = match serde_json::from_slice(&data) {
                Ok(record) => record,
                Err(e) => {
                    RESYNC_RECORDS.with_label_values(&["undecodable"]).inc();
                    warn!(context = %path, error = %e, "Skipping undecodable context");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.server.replay(&record).await {
                Ok(()) => {
                    RESYNC_RECORDS.with_label_values(&["replayed"]).inc();
                    report.replayed += 1;
                }
                Err(e) => {
                    RESYNC_RECORDS.with_label_values(&["rejected"]).inc();
                    warn!(context = %path, error = %e, "Resync of context failed");
                    report.skipped += 1;
                }
            }
        }

        report
    }
}
