//! # Enforcer Control-Plane Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── controller_enforcer.rs  # RpcTransport ↔ AuthenticatedHandler over unix sockets
//!     ├── monitor_events.rs       # Server.HandleEvent from an external client
//!     └── monitor_restart.rs      # persist, restart, resync through DirContextStore
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p enforcer-tests
//! cargo test -p enforcer-tests integration::monitor_restart
//! ```

pub mod integration;
