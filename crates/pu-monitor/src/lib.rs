//! # Lifecycle Monitor
//!
//! Receives process and container lifecycle events over RPC, routes them to
//! the handler registered for the unit type, and rebuilds its view of running
//! units from the context store when it starts.
//!
//! ## Lifecycle
//!
//! ```text
//! [Created] ──start()──→ [Started] ──stop()──→ [Stopped]
//!               │
//!               ├─ 1. bind the RPC socket
//!               ├─ 2. resync: replay every persisted record
//!               └─ 3. spawn the accept loop
//! ```
//!
//! Resync finishes before the first connection is accepted, so a live event
//! can never race the replay of the same unit.
//!
//! ## Module Structure
//!
//! ```text
//! domain/    - errors, EventDispatcher, metadata extraction
//! ports/     - ContextStore, EventHandler, PolicyHandler
//! service/   - MonitorServer (Server.HandleEvent), RpcMonitor
//! adapters/  - DirContextStore, MemoryContextStore, ProcessTracker
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DirContextStore, MemoryContextStore, ProcessTracker, TrackedUnit, UnitState};
pub use domain::{
    default_metadata_extractor, ContextStoreError, EventDispatcher, HandlerError,
    MetadataExtractor, MonitorError,
};
pub use ports::{ContextStore, EventHandler, PolicyHandler};
pub use service::{MonitorServer, ResyncReport, RpcMonitor};
