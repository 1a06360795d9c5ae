//! Shared fixtures for this crate's tests.

use crate::Retriever;
use crate::session::{ReaderSettings, Session};
use folio_cache::{ExpiringCache, ManualClock};
use folio_catalog::{Collection, DocumentRef};
use folio_config::RemoteConfig;
use folio_fetch::{Fetcher, MockTransport, Reply};
use folio_storage::backend::MemoryStore;
use std::sync::Arc;

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<MockTransport>,
    pub clock: Arc<ManualClock>,
    pub remote: RemoteConfig,
    pub retriever: Arc<Retriever>,
}
impl Fixture {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::default())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let transport = Arc::new(MockTransport::new());
        let clock = Arc::new(ManualClock::default());
        let remote = RemoteConfig {
            api_host: "https://api.test/repos/o/r".to_string(),
            raw_host: "https://raw.test/o/r/main".to_string(),
            ..RemoteConfig::default()
        };
        let cache = ExpiringCache::new(store.clone()).with_clock(clock.clone());
        let retriever = Arc::new(Retriever::new(Fetcher::new(transport.clone()), cache, remote.clone()));
        Self { store, transport, clock, remote, retriever }
    }

    pub fn listing_url(&self, collection: Collection) -> String {
        self.remote.listing_url(collection)
    }

    pub fn document_url(&self, document: &DocumentRef) -> String {
        self.remote.document_url(&document.identifier)
    }

    /// Serve a listing of `names` plus a body for each of them.
    pub fn serve(&self, collection: Collection, names: &[&str]) {
        let dir = self.remote.directory(collection).to_string();
        self.transport.set_route(self.listing_url(collection), [Reply::ok(listing_json(&dir, names))]);
        for name in names {
            let path = format!("{dir}/{name}");
            self.transport.set_route(self.remote.document_url(&path), [Reply::ok(format!("body of {path}"))]);
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.retriever.clone(), ReaderSettings::default())
    }
}

pub(crate) fn listing_json(dir: &str, names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| format!(r#"{{"name":"{name}","path":"{dir}/{name}","type":"file"}}"#))
        .collect();
    format!("[{}]", entries.join(","))
}

pub(crate) fn chapter_listing_json(names: &[&str]) -> String {
    listing_json("chapters", names)
}
