//! Listings expire, document bodies do not.
//!
//! A listing is stored as a JSON envelope `{"storedAt": <unix ms>, "entries":
//! [...]}` under its collection's listing key. Document bodies are stored
//! raw under `chapter_{sanitizedPath}` / `character_{sanitizedPath}`.

use crate::clock::{ClockHandle, SystemClock};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_catalog::{Collection, DocumentRef, Listing};
use folio_storage::{StoreHandle, keys};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::UtcDateTime;

/// Listings older than this are evicted on read.
pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingEnvelope {
    stored_at: i64,
    entries: Vec<DocumentRef>,
}

/// Key a collection's listing is cached under.
pub fn listing_key(collection: Collection) -> &'static str {
    match collection {
        Collection::Primary => keys::CHAPTER_LISTING,
        Collection::Profile => keys::CHARACTER_LISTING,
    }
}

/// Key a document body is cached under.
pub fn document_key(document: &DocumentRef) -> String {
    let prefix = match document.collection {
        Collection::Primary => keys::CHAPTER_PREFIX,
        Collection::Profile => keys::CHARACTER_PREFIX,
    };
    keys::document_key(prefix, &document.identifier)
}

fn unix_millis(at: UtcDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Expiring cache over a [`StateStore`](folio_storage::StateStore).
///
/// Every read hands out an owned copy; nothing is shared with the caller.
/// Both collections go through the same listing code path, parameterized by
/// [`Collection`].
#[derive(Clone)]
pub struct ExpiringCache {
    store: StoreHandle,
    clock: ClockHandle,
    listing_ttl: Duration,
}
impl ExpiringCache {
    pub fn new(store: StoreHandle) -> Self {
        Self { store, clock: Arc::new(SystemClock), listing_ttl: DEFAULT_LISTING_TTL }
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn listing_ttl(&self) -> Duration {
        self.listing_ttl
    }

    /// Cached listing for `collection`, if present and younger than the TTL.
    ///
    /// Stale and unreadable entries are evicted and reported as absent.
    pub async fn get_listing(&self, collection: Collection) -> Result<Option<Listing>> {
        let key = listing_key(collection);
        let Some(raw) = self.store.get(key).await.or_raise(|| ErrorKind::Storage)? else {
            tracing::debug!(%collection, "Listing cache miss");
            return Ok(None);
        };
        let envelope: ListingEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%collection, key, error = %err, "Evicting unreadable cached listing");
                self.evict(key).await?;
                return Ok(None);
            },
        };
        let age_ms = unix_millis(self.clock.now()).saturating_sub(envelope.stored_at);
        if u128::try_from(age_ms).is_ok_and(|age| age >= self.listing_ttl.as_millis()) {
            tracing::debug!(%collection, age_ms, "Evicting expired cached listing");
            self.evict(key).await?;
            return Ok(None);
        }
        tracing::debug!(%collection, entries = envelope.entries.len(), "Listing cache hit");
        Ok(Some(Listing::new(collection, envelope.entries)))
    }

    /// Store `listing`, stamped with the current time, replacing any prior entry.
    pub async fn put_listing(&self, listing: &Listing) -> Result<()> {
        let envelope = ListingEnvelope { stored_at: unix_millis(self.clock.now()), entries: listing.entries().to_vec() };
        let raw = serde_json::to_string(&envelope).or_raise(|| ErrorKind::InvalidData("listing".to_string()))?;
        self.store.set(listing_key(listing.collection()), &raw).await.or_raise(|| ErrorKind::Storage)
    }

    pub async fn get_document(&self, document: &DocumentRef) -> Result<Option<String>> {
        let body = self.store.get(&document_key(document)).await.or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(identifier = %document.identifier, hit = body.is_some(), "Document cache lookup");
        Ok(body)
    }

    pub async fn put_document(&self, document: &DocumentRef, body: &str) -> Result<()> {
        self.store.set(&document_key(document), body).await.or_raise(|| ErrorKind::Storage)
    }

    pub async fn contains_document(&self, document: &DocumentRef) -> Result<bool> {
        Ok(self.get_document(document).await?.is_some())
    }

    /// Drop every cached listing and document body plus the persisted
    /// current position. The bookmark is kept.
    ///
    /// Returns the number of entries removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for prefix in [keys::CHAPTER_PREFIX, keys::CHARACTER_PREFIX] {
            removed += self.store.clear_prefix(&format!("{prefix}_")).await.or_raise(|| ErrorKind::Storage)?;
        }
        let singles = Collection::ALL.map(listing_key).into_iter().chain(keys::POSITION_KEYS);
        for key in singles {
            if self.store.remove(key).await.or_raise(|| ErrorKind::Storage)? {
                removed += 1;
            }
        }
        tracing::info!(store = self.store.name(), removed, "Cleared cache");
        Ok(removed)
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.store.remove(key).await.or_raise(|| ErrorKind::Storage)?;
        Ok(())
    }
}
