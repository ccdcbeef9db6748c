//! # Error Types
//!
//! Parse errors for the enumerations carried inside `EventInfo`.

use thiserror::Error;

/// Errors raised when a wire value does not map onto a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The event type string is empty.
    #[error("event type is empty")]
    EmptyEventType,

    /// The event type string is not a recognised lifecycle value.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The unit type discriminant is out of range.
    #[error("unknown unit type: {0}")]
    UnknownPuType(u8),
}
