//! # Metadata Extraction
//!
//! Turns the loosely typed fields of an `EventInfo` into a `PuRuntime`
//! before a unit is brought up.

use super::MonitorError;
use shared_types::{EventInfo, PuRuntime};
use std::sync::Arc;

/// Pluggable extraction step. The monitor uses [`default_metadata_extractor`]
/// unless one is supplied at construction.
pub type MetadataExtractor =
    Arc<dyn Fn(&EventInfo) -> Result<PuRuntime, MonitorError> + Send + Sync>;

/// Requires a name, a unit id and a positive numeric pid.
pub fn default_metadata_extractor(event: &EventInfo) -> Result<PuRuntime, MonitorError> {
    if event.name.is_empty() {
        return Err(MonitorError::Metadata("unit name is empty".to_string()));
    }
    if event.pid.is_empty() {
        return Err(MonitorError::Metadata("pid is empty".to_string()));
    }
    if event.pu_id.is_empty() {
        return Err(MonitorError::Metadata("unit id is empty".to_string()));
    }

    let pid = event
        .pid
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| MonitorError::Metadata(format!("pid is not a positive integer: {}", event.pid)))?;

    Ok(PuRuntime {
        pid,
        name: event.name.clone(),
        tags: event.tags.clone(),
        ips: event.ips.clone(),
    })
}

/// The extractor used when none is configured.
pub(crate) fn default_extractor() -> MetadataExtractor {
    Arc::new(default_metadata_extractor)
}
