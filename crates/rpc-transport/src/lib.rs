//! # RPC Transport
//!
//! Secure session transport between the policy controller and the remote
//! enforcers, one unix-domain socket per enforced context.
//!
//! ## Architecture
//!
//! ```text
//! controller                                      remote enforcer
//! ┌──────────────────────────┐                   ┌──────────────────────────┐
//! │ RpcTransport             │   unix socket     │ RpcServer                │
//! │  ├─ ClientRegistry       │  one JSON frame   │  └─ AuthenticatedHandler │
//! │  │   context → Session   │ ────per line────▶ │      verify, then        │
//! │  └─ sign(payload,secret) │                   │      RequestHandler      │
//! └──────────────────────────┘                   └──────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | At most one live session per context | `ClientRegistry::insert` |
//! | Every outbound request is tagged | `RpcTransport::call` |
//! | Tag checked before any handler logic | `AuthenticatedHandler` |
//! | Dial retries are bounded | `TransportConfig::attempts` |
//! | Socket file removed on shutdown | `RpcServer` drop |

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use client::{RpcClient, RpcTransport};
pub use config::{TransportConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, ENV_RETRY_COUNT};
pub use error::TransportError;
pub use registry::{ClientRegistry, Session};
pub use server::{serve, AuthenticatedHandler, RequestHandler, RpcHandler, RpcServer};
