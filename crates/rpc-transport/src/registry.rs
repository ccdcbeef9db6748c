//! # Client Registry
//!
//! Concurrency-safe map from context identifier to its live session.
//!
//! The registry is the only state mutated from several tasks at once
//! (connect, lookup, destroy). Lookups take a shared lock; inserts and
//! removals take the exclusive lock and never hold it across an await.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::RpcClient;
use crate::TransportError;

/// An authenticated connection bound to one context.
pub struct Session {
    context_id: String,
    socket_path: PathBuf,
    secret: Vec<u8>,
    /// `None` once the session has been closed.
    pub(crate) client: Mutex<Option<RpcClient>>,
}

impl Session {
    pub(crate) fn new(
        context_id: impl Into<String>,
        socket_path: impl Into<PathBuf>,
        secret: Vec<u8>,
        client: RpcClient,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            socket_path: socket_path.into(),
            secret,
            client: Mutex::new(Some(client)),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Secret used to tag requests on this session.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Close the underlying connection. Calls in flight finish first.
    pub(crate) async fn close(&self) {
        let client = self.client.lock().await.take();
        if let Some(client) = client {
            if let Err(e) = client.close().await {
                tracing::debug!(context_id = %self.context_id, error = %e, "Error closing session");
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context_id", &self.context_id)
            .field("socket_path", &self.socket_path)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<String, Arc<Session>>,
    /// Live contexts in connection order.
    order: Vec<String>,
}

/// Registry of live sessions keyed by context identifier.
#[derive(Default)]
pub struct ClientRegistry {
    inner: RwLock<RegistryInner>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    ///
    /// # Errors
    ///
    /// `AlreadyConnected` if the context already has a live session. The
    /// rejected session is dropped, closing its connection.
    pub fn insert(&self, session: Session) -> Result<Arc<Session>, TransportError> {
        let mut inner = self.inner.write();
        if inner.sessions.contains_key(session.context_id()) {
            return Err(TransportError::AlreadyConnected(
                session.context_id().to_string(),
            ));
        }

        let context_id = session.context_id().to_string();
        let session = Arc::new(session);
        inner.sessions.insert(context_id.clone(), Arc::clone(&session));
        inner.order.push(context_id);
        Ok(session)
    }

    /// Look up the live session for a context.
    pub fn get(&self, context_id: &str) -> Result<Arc<Session>, TransportError> {
        self.inner
            .read()
            .sessions
            .get(context_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(context_id.to_string()))
    }

    /// Remove and return the session for a context, if any.
    pub fn remove(&self, context_id: &str) -> Option<Arc<Session>> {
        let mut inner = self.inner.write();
        let session = inner.sessions.remove(context_id)?;
        inner.order.retain(|id| id != context_id);
        Some(session)
    }

    #[must_use]
    pub fn contains(&self, context_id: &str) -> bool {
        self.inner.read().sessions.contains_key(context_id)
    }

    /// Live contexts in the order they connected.
    pub fn contexts(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
