//! Service layer: the RPC endpoint and the monitor state machine.

pub mod monitor;
pub mod server;

pub use monitor::{ResyncReport, RpcMonitor};
pub use server::MonitorServer;
