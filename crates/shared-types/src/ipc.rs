//! # RPC Messages
//!
//! Defines the frames exchanged over a session socket and the two message
//! families carried inside them:
//!
//! - `Request` / `Response`: controller → enforcer calls. The payload is
//!   opaque; only its integrity tag is checked by the transport.
//! - `EventInfo` / `MonitorResponse`: agent → monitor `HandleEvent` calls.
//!
//! ## Framing
//!
//! One JSON object per line. A call frame carries an `id` that the reply
//! frame echoes back; a non-null `error` in the reply is a call-level
//! failure and does not invalidate the connection.

use crate::security::{compute_tag, verify_tag};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The single method exposed by the lifecycle monitor.
pub const HANDLE_EVENT_METHOD: &str = "Server.HandleEvent";

/// Authenticated request sent over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque application payload.
    #[serde(rename = "Payload", default)]
    pub payload: Vec<u8>,

    /// Integrity tag over `payload`, filled in by the sender's transport.
    #[serde(rename = "HashAuth", default)]
    pub hash_auth: Vec<u8>,
}

impl Request {
    /// Create an untagged request.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            hash_auth: Vec::new(),
        }
    }

    /// Create an untagged request whose payload is the JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be serialized.
    pub fn from_json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::to_vec(value)?))
    }

    /// Decode the payload as JSON.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not a valid encoding of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }

    /// Attach the integrity tag for `secret`, replacing any existing tag.
    pub fn sign(&mut self, secret: &[u8]) {
        self.hash_auth = compute_tag(&self.payload, secret);
    }

    /// Check the attached tag against `secret`.
    #[must_use]
    pub fn is_authentic(&self, secret: &[u8]) -> bool {
        verify_tag(&self.payload, &self.hash_auth, secret)
    }
}

/// Result of a controller → enforcer call.
///
/// An empty `status` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Payload", default)]
    pub payload: Vec<u8>,

    #[serde(rename = "Status", default)]
    pub status: String,
}

impl Response {
    /// Successful response carrying `payload`.
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            status: String::new(),
        }
    }

    /// Failed response with a status message.
    pub fn failed(status: impl Into<String>) -> Self {
        Self {
            payload: Vec::new(),
            status: status.into(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_empty()
    }
}

/// Reply body of `Server.HandleEvent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorResponse {
    #[serde(rename = "Error", default)]
    pub error: String,
}

/// A call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A reply frame. Exactly one of `result` / `error` is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
    pub id: u64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RpcReply {
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}
