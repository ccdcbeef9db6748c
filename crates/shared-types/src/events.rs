//! # Lifecycle Events
//!
//! `EventInfo` describes one lifecycle transition of one enforced unit (a
//! process or a container). It is both the argument of the monitor's
//! `HandleEvent` call and the record persisted in the context store.

use crate::errors::TypeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of enforced unit. Selects the handler an event is routed to.
///
/// Serialized as its integer discriminant to stay compatible with persisted
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum PuType {
    /// A container managed by a container runtime.
    #[default]
    Container = 0,
    /// A plain Linux process (or process group).
    LinuxProcess = 1,
    /// A short-lived unit that is never persisted.
    Transient = 2,
}

impl PuType {
    /// Get the raw discriminant.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PuType {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Container),
            1 => Ok(Self::LinuxProcess),
            2 => Ok(Self::Transient),
            other => Err(TypeError::UnknownPuType(other)),
        }
    }
}

impl From<PuType> for u8 {
    fn from(value: PuType) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for PuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "Container(0)"),
            Self::LinuxProcess => write!(f, "LinuxProcess(1)"),
            Self::Transient => write!(f, "Transient(2)"),
        }
    }
}

/// Recognised lifecycle transitions.
///
/// The wire carries the event type as a free-form string so that an
/// unrecognised value can be rejected with a precise error instead of a
/// decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Start,
    Stop,
    Destroy,
    Pause,
    Unpause,
    Resync,
}

impl EventKind {
    /// Every recognised kind, in wire order.
    pub const ALL: [EventKind; 7] = [
        Self::Create,
        Self::Start,
        Self::Stop,
        Self::Destroy,
        Self::Pause,
        Self::Unpause,
        Self::Resync,
    ];

    /// Parse the wire representation.
    ///
    /// # Errors
    ///
    /// - `TypeError::EmptyEventType` for an empty string
    /// - `TypeError::UnknownEventType` for anything unrecognised
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        match value {
            "" => Err(TypeError::EmptyEventType),
            "create" => Ok(Self::Create),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "destroy" => Ok(Self::Destroy),
            "pause" => Ok(Self::Pause),
            "unpause" => Ok(Self::Unpause),
            "resync" => Ok(Self::Resync),
            other => Err(TypeError::UnknownEventType(other.to_string())),
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Resync => "resync",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle transition for one enforced unit.
///
/// Field names match the persisted record format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Lifecycle transition, see [`EventKind`].
    #[serde(rename = "EventType", default)]
    pub event_type: String,

    /// Unit type, selects the handler.
    #[serde(rename = "PUType", default)]
    pub pu_type: PuType,

    /// Unique unit identifier.
    #[serde(rename = "PUID", default)]
    pub pu_id: String,

    /// Human readable unit name (service name, container name).
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Policy tags attached to the unit.
    #[serde(rename = "Tags", default, deserialize_with = "null_as_empty")]
    pub tags: HashMap<String, String>,

    /// Process identifier, as reported by the caller.
    #[serde(rename = "PID", default)]
    pub pid: String,

    /// Addresses of the unit keyed by network name.
    #[serde(rename = "IPs", default, deserialize_with = "null_as_empty")]
    pub ips: HashMap<String, String>,
}

impl EventInfo {
    /// Create an event carrying only routing information.
    pub fn new(event: EventKind, pu_type: PuType) -> Self {
        Self {
            event_type: event.as_str().to_string(),
            pu_type,
            ..Self::default()
        }
    }

    /// Parse this event's type.
    ///
    /// # Errors
    ///
    /// See [`EventKind::parse`].
    pub fn kind(&self) -> Result<EventKind, TypeError> {
        EventKind::parse(&self.event_type)
    }
}

/// Normalized runtime descriptor handed to handlers once the metadata of an
/// event has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuRuntime {
    pub pid: u32,
    pub name: String,
    pub tags: HashMap<String, String>,
    pub ips: HashMap<String, String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}
