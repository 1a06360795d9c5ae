//! Best-effort read-ahead.
//!
//! At most one preload run is in flight at a time. A request arriving while
//! one is running is dropped, not queued. Failures are logged and
//! swallowed.

use crate::Retriever;
use folio_catalog::{DocumentRef, Listing};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

/// Clears the busy flag when the run ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);
impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Preloader {
    retriever: Arc<Retriever>,
    busy: Arc<AtomicBool>,
}
impl Preloader {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever, busy: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Warm the cache for the documents either side of `index`.
    ///
    /// Returns the handle of the spawned run, resolving to the number of
    /// documents actually fetched, or `None` if nothing was started.
    pub fn preload_neighbors(&self, listing: &Listing, index: usize) -> Option<JoinHandle<usize>> {
        let targets = listing.neighbors(index).into_iter().map(|(_, doc)| doc.clone()).collect();
        self.spawn(listing, index, targets)
    }

    /// Warm the cache for the document after `index` only.
    pub fn preload_next(&self, listing: &Listing, index: usize) -> Option<JoinHandle<usize>> {
        let targets = index.checked_add(1).and_then(|next| listing.get(next)).cloned().into_iter().collect();
        self.spawn(listing, index, targets)
    }

    fn spawn(&self, listing: &Listing, index: usize, targets: Vec<DocumentRef>) -> Option<JoinHandle<usize>> {
        let collection = listing.collection();
        if !collection.is_preloaded() {
            tracing::trace!(%collection, "Collection is never preloaded");
            return None;
        }
        if targets.is_empty() {
            return None;
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            tracing::debug!(%collection, index, "Preload already in flight, dropping request");
            return None;
        }
        let guard = BusyGuard(self.busy.clone());
        let retriever = self.retriever.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            let mut fetched = 0;
            for document in targets {
                match retriever.warm(&document).await {
                    Ok(true) => fetched += 1,
                    Ok(false) => {},
                    Err(err) => {
                        tracing::warn!(identifier = %document.identifier, error = %*err, "Preload failed");
                    },
                }
            }
            tracing::debug!(%collection, index, fetched, "Preload finished");
            fetched
        }))
    }
}
