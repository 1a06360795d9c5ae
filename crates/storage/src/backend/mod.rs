//! State store trait and implementations.
//!
//! This module defines the `StateStore` trait, which provides a unified
//! interface over the process-local key/value store that every other crate
//! persists its state into (cached listings, cached document bodies, the
//! current reading position and the bookmark).

mod local;
#[cfg(any(test, feature = "mock"))]
mod memory;

pub use self::local::LocalStore;
#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStore;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub(crate) type KeyStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Unified interface for state stores.
///
/// Values are plain strings; structured values are serialized by the caller.
/// All operations are asynchronous so that a store backed by the filesystem
/// never blocks the reader's event loop.
///
/// # Key Handling
/// Keys must pass [`validate_key`](crate::validate_key). Implementations
/// should enforce this validation.
///
/// # Examples
///
/// ```
/// use folio_storage::{StateStore, error::Result};
///
/// async fn visits(store: &dyn StateStore) -> Result<u64> {
///     let count = store
///         .get("visits")
///         .await?
///         .and_then(|v| v.parse::<u64>().ok())
///         .unwrap_or(0);
///     store.set("visits", &(count + 1).to_string()).await?;
///     Ok(count + 1)
/// }
/// ```
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Name of the store, used for logging only.
    fn name(&self) -> &str;

    /// List all keys matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`keys_stream()`](Self::keys_stream) into a [`Vec`] before
    /// returning.
    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        self.keys_stream(prefix).try_collect().await
    }

    /// Stream keys matching an optional prefix.
    ///
    /// Ordering is unspecified.
    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> KeyStream<'a>;

    /// Read a value. Missing keys are `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Returns `false` if there was nothing to delete.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Delete every key matching `prefix`, returning how many were removed.
    async fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.keys(Some(prefix)).await?;
        let mut removed = 0;
        for key in keys {
            if self.remove(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
