//! # Directory Context Store
//!
//! One directory per context under a base directory, each holding the
//! serialized `EventInfo` in `eventInfo.data`:
//!
//! ```text
//! <base>/
//!   test1/eventInfo.data
//!   trireme%2F1234/eventInfo.data
//! ```

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use super::{context_id, context_key};
use crate::domain::ContextStoreError;
use crate::ports::ContextStore;

/// File holding the record inside a context directory.
pub const EVENT_INFO_FILE: &str = "eventInfo.data";

pub struct DirContextStore {
    base: PathBuf,
}

impl DirContextStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn context_dir(&self, context: &str) -> Result<PathBuf, ContextStoreError> {
        Ok(self.base.join(context_key(context)?))
    }
}

#[async_trait]
impl ContextStore for DirContextStore {
    async fn walk_store(&self) -> Result<mpsc::Receiver<String>, ContextStoreError> {
        let mut entries = tokio::fs::read_dir(&self.base).await?;
        let mut contexts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                contexts.push(context_id(name));
            }
        }
        contexts.sort();

        let (tx, rx) = mpsc::channel(contexts.len() + 1);
        for context in contexts {
            // capacity covers every entry plus the sentinel
            let _ = tx.try_send(context);
        }
        let _ = tx.try_send(String::new());
        Ok(rx)
    }

    async fn get_context_info(&self, context: &str) -> Result<Vec<u8>, ContextStoreError> {
        let path = self.context_dir(context)?.join(EVENT_INFO_FILE);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ContextStoreError::NotFound(context.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store_context(&self, context: &str, data: &[u8]) -> Result<(), ContextStoreError> {
        let dir = self.context_dir(context)?;
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(EVENT_INFO_FILE), data).await?;
        Ok(())
    }

    async fn remove_context(&self, context: &str) -> Result<(), ContextStoreError> {
        let dir = self.context_dir(context)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
