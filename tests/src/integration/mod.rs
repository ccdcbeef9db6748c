//! Cross-crate integration flows.

pub mod controller_enforcer;
pub mod monitor_events;
pub mod monitor_restart;
