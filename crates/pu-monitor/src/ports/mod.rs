//! Ports layer: traits the host wires in.

pub mod outbound;

pub use outbound::{ContextStore, EventHandler, PolicyHandler};
