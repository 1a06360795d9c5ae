//! Cache-then-fetch.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use folio_cache::ExpiringCache;
use folio_catalog::{Collection, DocumentRef, Listing, RemoteEntry};
use folio_config::RemoteConfig;
use folio_fetch::Fetcher;
use folio_fetch::error::ErrorKind as FetchErrorKind;
use tokio::sync::RwLock;
use tracing::instrument;

/// Where a document body came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    #[display("cache")]
    Cache,
    #[display("network")]
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub body: String,
    pub origin: Origin,
}

/// Turns listing and document requests into text, consulting the cache
/// first and persisting every successful fetch into it.
///
/// Cache failures never fail a request: a broken read is a miss and a
/// broken write is only logged. A fetch that was started before the last
/// [`clear`](Self::clear) never writes its result back.
pub struct Retriever {
    fetcher: Fetcher,
    cache: ExpiringCache,
    remote: RemoteConfig,
    /// Bumped by every clear. Held for reading across each cache write.
    generation: RwLock<u64>,
}
impl Retriever {
    pub fn new(fetcher: Fetcher, cache: ExpiringCache, remote: RemoteConfig) -> Self {
        Self { fetcher, cache, remote, generation: RwLock::new(0) }
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    /// Empty the cache and invalidate every fetch still in flight.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear(&self) -> Result<usize> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        self.cache.clear_all().await.or_raise(|| ErrorKind::Storage)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn listing(&self, collection: Collection) -> Result<Listing> {
        let generation = *self.generation.read().await;
        match self.cache.get_listing(collection).await {
            Ok(Some(listing)) => return Ok(listing),
            Ok(None) => {},
            Err(err) => tracing::warn!(%collection, error = %*err, "Listing cache read failed"),
        }
        let url = self.remote.listing_url(collection);
        let entries: Vec<RemoteEntry> =
            self.fetcher.fetch_json(&url).await.or_raise(|| ErrorKind::ListingUnavailable { collection })?;
        let listing = Listing::from_remote(collection, entries);
        tracing::info!(%collection, documents = listing.len(), "Fetched listing");
        let current = self.generation.read().await;
        if *current != generation {
            tracing::debug!(%collection, "Cache cleared during fetch, not storing listing");
        } else if let Err(err) = self.cache.put_listing(&listing).await {
            tracing::warn!(%collection, error = %*err, "Listing cache write failed");
        }
        drop(current);
        Ok(listing)
    }

    #[instrument(level = "debug", skip(self, document), fields(identifier = %document.identifier))]
    pub async fn document(&self, document: &DocumentRef) -> Result<Fetched> {
        let generation = *self.generation.read().await;
        match self.cache.get_document(document).await {
            Ok(Some(body)) => return Ok(Fetched { body, origin: Origin::Cache }),
            Ok(None) => {},
            Err(err) => tracing::warn!(error = %*err, "Document cache read failed"),
        }
        let url = self.remote.document_url(&document.identifier);
        let body = match self.fetcher.fetch_text(&url).await {
            Ok(body) => body,
            Err(err) => {
                let kind = match &*err {
                    FetchErrorKind::NotFound(_) => ErrorKind::NotFound(document.identifier.clone()),
                    _ => ErrorKind::Unavailable(document.identifier.clone()),
                };
                return Err(err).or_raise(|| kind);
            },
        };
        let current = self.generation.read().await;
        if *current != generation {
            tracing::debug!("Cache cleared during fetch, not storing document");
        } else if let Err(err) = self.cache.put_document(document, &body).await {
            tracing::warn!(error = %*err, "Document cache write failed");
        }
        drop(current);
        Ok(Fetched { body, origin: Origin::Network })
    }

    /// Make sure `document` is cached. Returns `true` if it had to be fetched.
    pub async fn warm(&self, document: &DocumentRef) -> Result<bool> {
        Ok(self.document(document).await?.origin == Origin::Network)
    }
}
