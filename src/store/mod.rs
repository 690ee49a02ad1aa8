/// Durable key-value storage
///
/// A string-keyed, string-valued store. The identity cache and the session
/// layer persist through it; nothing else in the client touches disk.

pub mod sqlite;

pub use sqlite::{SqliteKvStore, StoreOptions};

use crate::error::ClientResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key-value store that survives process restarts
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` if the key was never set
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store that reads as empty and refuses every write
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingKvStore;

#[cfg(test)]
#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> ClientResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> ClientResult<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
    }
}
