//! # RPC Server
//!
//! Serving side of a session socket.
//!
//! The accept loop is a task bound to a `watch` stop signal. Stopping only
//! ends accepting; connections already accepted keep running until their
//! peer hangs up. Each accepted connection is served on its own task.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use enforcer_telemetry::INTEGRITY_FAILURES;
use serde_json::Value;
use shared_types::{Request, Response, RpcCall, RpcReply};
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::{read_frame, write_frame};
use crate::TransportError;

/// Only protocol accepted by [`serve`].
pub const UNIX_PROTOCOL: &str = "unix";

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

// =============================================================================
// HANDLER TRAITS
// =============================================================================

/// The RPC-callable surface registered with a server.
///
/// An `Err` is a call-level failure: it is sent back as the reply's `error`
/// and the connection stays open.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String>;
}

/// Application handler for authenticated `Request`s.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle_request(&self, method: &str, request: Request) -> Response;
}

/// Verifies every incoming `Request` before the inner handler sees it.
pub struct AuthenticatedHandler<H> {
    inner: H,
    secret: Vec<u8>,
}

impl<H: RequestHandler> AuthenticatedHandler<H> {
    pub fn new(inner: H, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            secret: secret.into(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: RequestHandler> RpcHandler for AuthenticatedHandler<H> {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String> {
        let request: Request = serde_json::from_value(params)
            .map_err(|e| TransportError::Codec(e).to_string())?;

        if !request.is_authentic(&self.secret) {
            INTEGRITY_FAILURES.inc();
            warn!(method = method, "Rejected request with invalid integrity tag");
            return Err(TransportError::Integrity.to_string());
        }

        let response = self.inner.handle_request(method, request).await;
        serde_json::to_value(response).map_err(|e| TransportError::Codec(e).to_string())
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// A bound unix-socket listener. The socket file is removed on drop.
pub struct RpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl RpcServer {
    /// Bind a listener at `path`.
    ///
    /// A stale file at `path` is removed first.
    ///
    /// # Errors
    ///
    /// - `Configuration` for an empty path
    /// - `AddressInUse` if a live listener already answers at `path`
    /// - `Io` if the stale file cannot be removed or the bind fails
    pub async fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(TransportError::Configuration(
                "socket path must not be empty".to_string(),
            ));
        }

        if std::fs::symlink_metadata(&path).is_ok() {
            if UnixStream::connect(&path).await.is_ok() {
                return Err(TransportError::AddressInUse(path.display().to_string()));
            }
            std::fs::remove_file(&path)?;
            debug!(socket = %path.display(), "Removed stale socket file");
        }

        let listener = UnixListener::bind(&path)?;
        info!(socket = %path.display(), "RPC server bound");

        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until `shutdown` flips to `true` or its sender is
    /// dropped. Consumes the server; the socket file is removed on return.
    pub async fn serve(
        self,
        handler: Arc<dyn RpcHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        info!(socket = %self.path.display(), "RPC server accepting connections");

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, handler).await {
                                debug!(error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!(socket = %self.path.display(), "RPC server stopped");
        Ok(())
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(socket = %self.path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    handler: Arc<dyn RpcHandler>,
) -> Result<(), TransportError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(call) = read_frame::<_, RpcCall>(&mut reader).await? {
        let reply = match handler.handle(&call.method, call.params).await {
            Ok(result) => RpcReply::success(call.id, result),
            Err(error) => RpcReply::failure(call.id, error),
        };
        write_frame(&mut write_half, &reply).await?;
    }

    Ok(())
}

/// Bind `path` and serve `handler` until `shutdown` fires.
///
/// # Errors
///
/// `Configuration` for any protocol other than `"unix"`, otherwise see
/// [`RpcServer::bind`].
pub async fn serve(
    protocol: &str,
    path: impl AsRef<Path>,
    handler: Arc<dyn RpcHandler>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    if protocol != UNIX_PROTOCOL {
        return Err(TransportError::Configuration(format!(
            "unsupported protocol: {protocol}"
        )));
    }

    RpcServer::bind(path).await?.serve(handler, shutdown).await
}
