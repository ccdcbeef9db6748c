//! Domain layer: dispatch table, metadata extraction and error types.

pub mod dispatcher;
pub mod errors;
pub mod metadata;

pub use dispatcher::EventDispatcher;
pub use errors::{ContextStoreError, HandlerError, MonitorError};
pub use metadata::{default_metadata_extractor, MetadataExtractor};
