//! Adapters: context store implementations and the reference process tracker.

pub mod dir_store;
pub mod memory_store;
pub mod process_tracker;

pub use dir_store::DirContextStore;
pub use memory_store::MemoryContextStore;
pub use process_tracker::{ProcessTracker, TrackedUnit, UnitState};

use crate::domain::ContextStoreError;

/// Map a context path (`"/id"` or `"id"`) to its single-segment key.
///
/// Unit ids may be cgroup-style paths (`/trireme/1234`), so inner `/` are
/// escaped as `%2F` (and `%` as `%25`) rather than rejected.
pub(crate) fn context_key(context: &str) -> Result<String, ContextStoreError> {
    let id = context.trim_start_matches('/');
    if id.is_empty() || id == "." || id == ".." {
        return Err(ContextStoreError::InvalidContext(context.to_string()));
    }
    Ok(id.replace('%', "%25").replace('/', "%2F"))
}

/// Inverse of [`context_key`]: the id a store walk reports for a key.
pub(crate) fn context_id(key: &str) -> String {
    key.replace("%2F", "/").replace("%25", "%")
}
