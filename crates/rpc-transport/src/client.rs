//! # Secure Transport (client side)
//!
//! `RpcClient` is a single framed connection. `RpcTransport` owns the
//! registry of per-context sessions and is what the controller uses to reach
//! each remote enforcer: dial with bounded retry, tag every request with the
//! session secret, call, and tear down.

use std::io;
use std::path::Path;
use std::sync::Arc;

use enforcer_telemetry::{
    log_session_event, time_histogram, RPC_CALLS, RPC_CALL_DURATION, SESSIONS_ACTIVE,
    SESSION_DIALS,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Request, Response, RpcCall, RpcReply};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::codec::{read_frame, write_frame};
use crate::registry::{ClientRegistry, Session};
use crate::{TransportConfig, TransportError};

// =============================================================================
// RPC CLIENT
// =============================================================================

/// One framed connection to an RPC server.
pub struct RpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl RpcClient {
    /// Dial a unix socket once.
    pub async fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::from_stream(stream))
    }

    pub(crate) fn from_stream(stream: UnixStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_id: 0,
        }
    }

    /// Perform one call and decode its result.
    ///
    /// # Errors
    ///
    /// - `Remote` if the server answered with a call-level error
    /// - `ConnectionClosed` if the server hung up before replying
    /// - `UnexpectedReply` if the server answered a call that was never made
    /// - `Io` / `Codec` on transport failures
    pub async fn call<P, R>(&mut self, method: &str, params: &P) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.next_id += 1;
        let id = self.next_id;

        let frame = RpcCall {
            id,
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };
        write_frame(&mut self.writer, &frame).await?;

        // A call dropped after writing its frame leaves its reply queued
        // ahead of ours; replies carry ids in call order.
        let reply = loop {
            let reply: RpcReply = read_frame(&mut self.reader)
                .await?
                .ok_or(TransportError::ConnectionClosed)?;
            if reply.id >= id {
                break reply;
            }
            debug!(expected = id, got = reply.id, "Discarding reply to abandoned call");
        };

        if reply.id != id {
            return Err(TransportError::UnexpectedReply {
                expected: id,
                got: reply.id,
            });
        }
        if let Some(error) = reply.error {
            return Err(TransportError::Remote(error));
        }

        Ok(serde_json::from_value(
            reply.result.unwrap_or(serde_json::Value::Null),
        )?)
    }

    /// Shut down the write side; the server sees end of stream.
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

// =============================================================================
// SECURE TRANSPORT
// =============================================================================

/// Controller-side session manager.
pub struct RpcTransport {
    config: TransportConfig,
    registry: ClientRegistry,
}

impl Default for RpcTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl RpcTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            registry: ClientRegistry::new(),
        }
    }

    /// Create a transport whose retry budget is read from the environment.
    pub fn from_env() -> Self {
        Self::new(TransportConfig::from_env())
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Open a session for `context_id`.
    ///
    /// Dials `socket_path`, retrying with a fixed backoff until the attempt
    /// budget runs out.
    ///
    /// # Errors
    ///
    /// - `AlreadyConnected` if the context already has a live session
    /// - `Connection` carrying the last dial error once retries are exhausted;
    ///   nothing is registered in that case
    pub async fn connect(
        &self,
        context_id: &str,
        socket_path: impl AsRef<Path>,
        secret: impl Into<Vec<u8>>,
    ) -> Result<(), TransportError> {
        if self.registry.contains(context_id) {
            return Err(TransportError::AlreadyConnected(context_id.to_string()));
        }

        let socket_path = socket_path.as_ref();
        let client = self.dial(socket_path).await?;

        self.registry.insert(Session::new(
            context_id,
            socket_path,
            secret.into(),
            client,
        ))?;
        SESSIONS_ACTIVE.inc();

        log_session_event!(info, "Session established", context_id, socket = %socket_path.display());
        Ok(())
    }

    async fn dial(&self, path: &Path) -> Result<RpcClient, TransportError> {
        let attempts = self.config.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match RpcClient::connect(path).await {
                Ok(client) => {
                    SESSION_DIALS.with_label_values(&["connected"]).inc();
                    if attempt > 1 {
                        debug!(socket = %path.display(), attempt, "Dial succeeded after retry");
                    }
                    return Ok(client);
                }
                Err(e) if attempt < attempts => {
                    SESSION_DIALS.with_label_values(&["retry"]).inc();
                    debug!(socket = %path.display(), attempt, error = %e, "Dial failed, retrying");
                    tokio::time::sleep(self.config.retry_interval).await;
                }
                Err(e) => {
                    SESSION_DIALS.with_label_values(&["exhausted"]).inc();
                    warn!(socket = %path.display(), attempts = attempt, error = %e, "Giving up on dial");
                    return Err(TransportError::Connection {
                        path: path.display().to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Live session for a context.
    pub fn get_session(&self, context_id: &str) -> Result<Arc<Session>, TransportError> {
        self.registry.get(context_id)
    }

    /// Tag `request` with the session secret and call `method`.
    ///
    /// Failures are returned unchanged; there is no retry at this layer.
    ///
    /// # Errors
    ///
    /// `NotFound` if the context has no live session, otherwise whatever the
    /// call itself produced.
    pub async fn call(
        &self,
        context_id: &str,
        method: &str,
        mut request: Request,
    ) -> Result<Response, TransportError> {
        let session = self.registry.get(context_id)?;
        request.sign(session.secret());

        let _timer = time_histogram!(RPC_CALL_DURATION);
        let mut guard = session.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| TransportError::NotFound(context_id.to_string()))?;

        let result = client.call(method, &request).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        RPC_CALLS.with_label_values(&[method, outcome]).inc();

        if let Err(e) = &result {
            log_session_event!(debug, "Call failed", context_id, method = method, error = %e);
        }
        result
    }

    /// Serialize `payload` as JSON into a request and [`call`](Self::call) it.
    pub async fn call_json<T: Serialize>(
        &self,
        context_id: &str,
        method: &str,
        payload: &T,
    ) -> Result<Response, TransportError> {
        self.call(context_id, method, Request::from_json(payload)?)
            .await
    }

    /// Check a received request against `secret` in constant time.
    #[must_use]
    pub fn verify(request: &Request, secret: &[u8]) -> bool {
        request.is_authentic(secret)
    }

    /// Close the session, remove its socket file and forget the context.
    ///
    /// Unknown contexts are ignored.
    ///
    /// # Errors
    ///
    /// Only if the socket file exists and cannot be removed. The session is
    /// already gone from the registry at that point.
    pub async fn destroy(&self, context_id: &str) -> Result<(), TransportError> {
        let Some(session) = self.registry.remove(context_id) else {
            debug!(context_id = %context_id, "Destroy for unknown context ignored");
            return Ok(());
        };
        SESSIONS_ACTIVE.dec();

        session.close().await;

        match std::fs::remove_file(session.socket_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        log_session_event!(info, "Session destroyed", context_id);
        Ok(())
    }

    /// Live contexts in connection order.
    pub fn list_contexts(&self) -> Vec<String> {
        self.registry.contexts()
    }
}
