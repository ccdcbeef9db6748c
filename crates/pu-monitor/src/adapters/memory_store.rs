//! In-memory context store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use super::{context_id, context_key};
use crate::domain::ContextStoreError;
use crate::ports::ContextStore;

/// Records kept in a sorted map; walks yield keys in order.
#[derive(Default)]
pub struct MemoryContextStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn contains(&self, context: &str) -> bool {
        context_key(context).is_ok_and(|key| self.records.read().contains_key(&key))
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn walk_store(&self) -> Result<mpsc::Receiver<String>, ContextStoreError> {
        let keys: Vec<String> = self.records.read().keys().map(|k| context_id(k)).collect();
        let (tx, rx) = mpsc::channel(keys.len() + 1);
        for key in keys {
            let _ = tx.try_send(key);
        }
        let _ = tx.try_send(String::new());
        Ok(rx)
    }

    async fn get_context_info(&self, context: &str) -> Result<Vec<u8>, ContextStoreError> {
        let key = context_key(context)?;
        self.records
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| ContextStoreError::NotFound(context.to_string()))
    }

    async fn store_context(&self, context: &str, data: &[u8]) -> Result<(), ContextStoreError> {
        let key = context_key(context)?;
        self.records.write().insert(key, data.to_vec());
        Ok(())
    }

    async fn remove_context(&self, context: &str) -> Result<(), ContextStoreError> {
        let key = context_key(context)?;
        self.records.write().remove(&key);
        Ok(())
    }
}
