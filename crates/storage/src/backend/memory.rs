//! In-memory state store for testing.

use super::KeyStream;
use crate::StateStore;
use crate::error::Result;
use crate::keys::validate as validate_key;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory state store for testing.
///
/// Values live in a `BTreeMap` behind a [`RwLock`], so all trait methods can
/// operate on `&self` without external synchronisation.
///
/// Enable the `mock` feature from `[dev-dependencies]` to use it from
/// other crates' tests.
pub struct MemoryStore {
    name: String,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create a memory store pre-populated with entries.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            if validate_key(&key).is_err() {
                panic!("MemoryStore::with_entries: invalid key {key:?}");
            }
            map.insert(key, value.into());
        }
        Self {
            name: "memory".to_string(),
            entries: RwLock::new(map),
        }
    }

    /// Change the name of the memory store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Snapshot of every stored entry, in key order.
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().await.clone()
    }
}
impl Default for MemoryStore {
    fn default() -> Self {
        let entries: [(&str, &str); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> KeyStream<'a> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let keys: Vec<String> = {
                let guard = self.entries.read().await;
                guard
                    .keys()
                    .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
                    .cloned()
                    .collect()
            };
            for key in keys {
                yield Ok(key);
            }
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.entries.write().await.remove(key).is_some())
    }
}
