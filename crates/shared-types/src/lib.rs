//! # Shared Types Crate
//!
//! Types that cross a process boundary between the policy controller, the
//! remote enforcers and the lifecycle monitor.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every wire type is defined here and only here.
//! - **Opaque Payloads**: `Request` carries raw bytes; only the integrity tag
//!   over those bytes is interpreted by the transport.
//! - **Persisted Compatibility**: `EventInfo` keeps the field names used by the
//!   context store so that records written by older agents still decode.

pub mod errors;
pub mod events;
pub mod ipc;
pub mod security;

pub use errors::*;
pub use events::*;
pub use ipc::*;
pub use security::*;
