//! # Flow Collector
//!
//! Aggregates flow reports from an enforcer. Reports that describe the same
//! flow (same context, endpoints and port) share one entry whose count is the
//! sum of every report, so totals do not depend on arrival order.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::trace;

/// One observed flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub context_id: String,
    pub source_id: String,
    pub destination_id: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub destination_port: u16,
    /// Packets or connections seen; summed across reports.
    pub count: u64,
}

/// Hex SHA-256 over the identifying fields of a flow. `count` is excluded.
pub fn flow_fingerprint(record: &FlowRecord) -> String {
    let mut hasher = Sha256::new();
    for field in [
        record.context_id.as_str(),
        record.source_id.as_str(),
        record.destination_id.as_str(),
        record.source_ip.as_str(),
        record.destination_ip.as_str(),
    ] {
        // length prefix keeps ("ab","c") and ("a","bc") apart
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update(record.destination_port.to_be_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Default)]
pub struct FlowCollector {
    flows: RwLock<HashMap<String, FlowRecord>>,
}

impl FlowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `record` into the entry for its fingerprint.
    pub fn collect_flow_event(&self, record: &FlowRecord) {
        let key = flow_fingerprint(record);
        let mut flows = self.flows.write();
        match flows.get_mut(&key) {
            Some(existing) => existing.count = existing.count.saturating_add(record.count),
            None => {
                flows.insert(key.clone(), record.clone());
            }
        }
        trace!(fingerprint = %key, count = record.count, "Collected flow");
    }

    /// Snapshot of every entry keyed by fingerprint.
    pub fn flows(&self) -> HashMap<String, FlowRecord> {
        self.flows.read().clone()
    }

    pub fn get(&self, fingerprint: &str) -> Option<FlowRecord> {
        self.flows.read().get(fingerprint).cloned()
    }

    /// Remove and return every entry, e.g. for a periodic report.
    pub fn take_flows(&self) -> HashMap<String, FlowRecord> {
        std::mem::take(&mut *self.flows.write())
    }

    pub fn len(&self) -> usize {
        self.flows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.read().is_empty()
    }
}
