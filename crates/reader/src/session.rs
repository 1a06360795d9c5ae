//! The reading session.
//!
//! A [`Session`] owns everything that is process-wide in a reader: both
//! listings, the displayed document, the position state machine and the
//! preload slot. All operations take `&self` so that loads may overlap;
//! every document load draws a ticket from a monotonically increasing
//! sequence and a response whose ticket is no longer the newest is dropped
//! as [`LoadOutcome::Superseded`] instead of being displayed.

use crate::error::{ErrorKind, Result};
use crate::notice::NoticeBoard;
use crate::position::{Position, PositionTracker, ReadingPosition, TrackerState};
use crate::preload::Preloader;
use crate::progress::{Navigation, Progress};
use crate::retriever::{Origin, Retriever};
use exn::OptionExt;
use folio_catalog::{Collection, DocumentRef, Listing, SearchHit, search};
use folio_config::ReaderConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderSettings {
    /// Fraction of the document height past which the next document is preloaded.
    pub preload_threshold: f64,
    /// How long a replayed position waits for the content before restoring
    /// its scroll offset.
    pub restore_delay: Duration,
    pub notice_delay: Duration,
}
impl Default for ReaderSettings {
    fn default() -> Self {
        Self::from(&ReaderConfig::default())
    }
}
impl From<&ReaderConfig> for ReaderSettings {
    fn from(config: &ReaderConfig) -> Self {
        Self {
            preload_threshold: config.preload_threshold,
            restore_delay: config.bookmark_restore_delay(),
            notice_delay: config.notice_delay(),
        }
    }
}

/// What the reader is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub document: DocumentRef,
    pub position: Position,
    pub body: String,
    pub origin: Origin,
    pub scroll_offset: u64,
    pub progress: Progress,
    pub navigation: Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The document is now displayed.
    Applied(View),
    /// A newer load started before this one finished; its result was dropped.
    Superseded,
    /// Navigation past the first or last document; nothing changed.
    AtBoundary,
}
impl LoadOutcome {
    pub fn view(&self) -> Option<&View> {
        match self {
            Self::Applied(view) => Some(view),
            Self::Superseded | Self::AtBoundary => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Displayed {
    document: DocumentRef,
    body: String,
    origin: Origin,
}

#[derive(Debug, Default)]
struct State {
    listings: HashMap<Collection, Listing>,
    tracker: TrackerState,
    displayed: Option<Displayed>,
    /// Ticket of the newest document load.
    latest: u64,
    /// Whether scrolling already started a read-ahead of the next document.
    next_requested: bool,
}
impl State {
    fn listing(&self, collection: Collection) -> Listing {
        self.listings.get(&collection).cloned().unwrap_or_else(|| Listing::new(collection, []))
    }

    fn next_ticket(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn view(&self) -> Option<View> {
        let current = self.tracker.current()?;
        let displayed = self.displayed.as_ref()?;
        let (collection, index) = (current.collection(), current.index());
        let total = self.listings.get(&collection).map_or(0, Listing::len);
        Some(View {
            document: displayed.document.clone(),
            position: current.position,
            body: displayed.body.clone(),
            origin: displayed.origin,
            scroll_offset: current.scroll_offset,
            progress: Progress { collection, index, total },
            navigation: Navigation::at(index, total),
        })
    }
}

pub struct Session {
    retriever: Arc<Retriever>,
    tracker: PositionTracker,
    preloader: Preloader,
    notices: NoticeBoard,
    settings: ReaderSettings,
    state: Mutex<State>,
    preload: Mutex<Option<JoinHandle<usize>>>,
}
impl Session {
    pub fn new(retriever: Arc<Retriever>, settings: ReaderSettings) -> Self {
        Self {
            tracker: PositionTracker::new(retriever.cache().store().clone()),
            preloader: Preloader::new(retriever.clone()),
            notices: NoticeBoard::new(settings.notice_delay),
            retriever,
            settings,
            state: Mutex::new(State::default()),
            preload: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    /// Listing of `collection` as last loaded; empty before the first load.
    pub fn listing(&self, collection: Collection) -> Listing {
        self.state().listing(collection)
    }

    pub fn current(&self) -> Option<ReadingPosition> {
        self.state().tracker.current().cloned()
    }

    pub fn view(&self) -> Option<View> {
        self.state().view()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.view().map(|view| view.progress)
    }

    pub fn navigation(&self) -> Navigation {
        self.view().map(|view| view.navigation).unwrap_or_default()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let state = self.state();
        search(query, Collection::ALL.iter().filter_map(|collection| state.listings.get(collection)))
    }

    /// Load one listing.
    ///
    /// On failure the listing stays as it was (empty on first load) and an
    /// error notice is posted.
    #[instrument(level = "debug", skip(self))]
    pub async fn load_listing(&self, collection: Collection) -> Result<usize> {
        match self.retriever.listing(collection).await {
            Ok(listing) => {
                let len = listing.len();
                self.state().listings.insert(collection, listing);
                Ok(len)
            },
            Err(err) => {
                tracing::warn!(%collection, error = %*err, "Listing unavailable");
                self.state().listings.entry(collection).or_insert_with(|| Listing::new(collection, []));
                self.notices.error(format!("加载{}列表失败", collection.label()));
                Err(err)
            },
        }
    }

    /// Load both listings concurrently. One failing never blocks the other.
    pub async fn load_listings(&self) -> Vec<(Collection, Result<usize>)> {
        let (primary, profile) =
            futures::join!(self.load_listing(Collection::Primary), self.load_listing(Collection::Profile));
        vec![(Collection::Primary, primary), (Collection::Profile, profile)]
    }

    /// Load the document at `index` of the loaded `collection` listing.
    #[instrument(level = "debug", skip(self))]
    pub async fn load_document(&self, collection: Collection, index: usize) -> Result<LoadOutcome> {
        let document = self
            .state()
            .listings
            .get(&collection)
            .and_then(|listing| listing.get(index))
            .cloned()
            .ok_or_raise(|| ErrorKind::IndexOutOfRange { collection, index })?;
        self.load(document, Position::new(collection, index)).await.map(|(_, outcome)| outcome)
    }

    /// Load a document by identifier.
    ///
    /// The listing index is looked up in the loaded listing; `index_hint` is
    /// used when the listing does not (or no longer) contain the document.
    #[instrument(level = "debug", skip(self))]
    pub async fn open(&self, collection: Collection, identifier: &str, index_hint: usize) -> Result<LoadOutcome> {
        let (document, position) = self.locate(collection, identifier, index_hint);
        self.load(document, position).await.map(|(_, outcome)| outcome)
    }

    fn locate(&self, collection: Collection, identifier: &str, index_hint: usize) -> (DocumentRef, Position) {
        let state = self.state();
        let listing = state.listings.get(&collection);
        let found = listing.and_then(|listing| {
            let index = Some(index_hint)
                .filter(|&i| listing.get(i).is_some_and(|doc| doc.identifier == identifier))
                .or_else(|| listing.position_of(identifier))?;
            Some((listing.get(index)?.clone(), index))
        });
        let (document, index) =
            found.unwrap_or_else(|| (DocumentRef::from_path(collection, identifier), index_hint));
        (document, Position::new(collection, index))
    }

    /// Load `document`, returning the ticket the load ran under alongside
    /// its outcome.
    async fn load(&self, document: DocumentRef, position: Position) -> Result<(u64, LoadOutcome)> {
        let ticket = self.state().next_ticket();
        let result = self.retriever.document(&document).await;
        let (current, listing, view) = {
            let mut state = self.state();
            if state.latest != ticket {
                tracing::debug!(identifier = %document.identifier, ticket, latest = state.latest, "Dropping superseded load");
                return Ok((ticket, LoadOutcome::Superseded));
            }
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(err) => {
                    if state.displayed.is_none() {
                        self.notices.error(format!("加载{}失败", document.display_name));
                    }
                    tracing::warn!(identifier = %document.identifier, error = %*err, "Document load failed");
                    return Err(err);
                },
            };
            let current = ReadingPosition { position, identifier: document.identifier.clone(), scroll_offset: 0 };
            state.tracker.view(current.clone());
            state.displayed = Some(Displayed { document, body: fetched.body, origin: fetched.origin });
            state.next_requested = false;
            let listing = state.listing(position.collection());
            let view = state.view().ok_or_raise(|| ErrorKind::NoActiveDocument)?;
            (current, listing, view)
        };
        self.notices.dismiss_errors();
        tracing::info!(identifier = %current.identifier, index = current.index(), origin = %view.origin, "Document loaded");
        if let Err(err) = self.tracker.persist(&current).await {
            tracing::warn!(error = %*err, "Could not persist reading position");
        }
        self.track_preload(self.preloader.preload_neighbors(&listing, current.index()));
        Ok((ticket, LoadOutcome::Applied(view)))
    }

    fn track_preload(&self, handle: Option<JoinHandle<usize>>) {
        if let Some(handle) = handle {
            *self.preload.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }
    }

    /// Wait for the most recent preload run, if any, returning how many
    /// documents it fetched.
    pub async fn settle_preload(&self) -> Option<usize> {
        let handle = self.preload.lock().unwrap_or_else(PoisonError::into_inner).take();
        handle?.await.ok()
    }

    pub async fn navigate_next(&self) -> Result<LoadOutcome> {
        self.navigate(true).await
    }

    pub async fn navigate_previous(&self) -> Result<LoadOutcome> {
        self.navigate(false).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn navigate(&self, forward: bool) -> Result<LoadOutcome> {
        let (position, total) = {
            let state = self.state();
            let current = state.tracker.current().ok_or_raise(|| ErrorKind::NoActiveDocument)?;
            (current.position, state.listings.get(&current.collection()).map_or(0, Listing::len))
        };
        let target = if forward { position.index().checked_add(1) } else { position.index().checked_sub(1) };
        match target {
            Some(index) if index < total => self.load_document(position.collection(), index).await,
            _ => Ok(LoadOutcome::AtBoundary),
        }
    }

    /// Record the live scroll offset of the displayed document.
    ///
    /// Once the offset passes the preload threshold of `document_height`, the
    /// next document is read ahead (once per displayed document). Returns
    /// whether a read-ahead was started. Without a displayed document this
    /// does nothing.
    pub async fn update_scroll(&self, offset: u64, document_height: u64) -> Result<bool> {
        let candidate = {
            let mut state = self.state();
            if !state.tracker.scroll_to(offset) {
                return Ok(false);
            }
            let passed = document_height > 0 && offset as f64 >= self.settings.preload_threshold * document_height as f64;
            match state.tracker.current() {
                Some(current) if passed && !state.next_requested => {
                    Some((state.listing(current.collection()), current.index()))
                },
                _ => None,
            }
        };
        self.tracker.persist_scroll(offset).await?;
        let Some((listing, index)) = candidate else {
            return Ok(false);
        };
        let handle = self.preloader.preload_next(&listing, index);
        let started = handle.is_some();
        if started {
            tracing::debug!(index, offset, document_height, "Scrolled past threshold, reading ahead");
            self.state().next_requested = true;
        }
        self.track_preload(handle);
        Ok(started)
    }

    /// Snapshot the current position, live scroll offset included, into the
    /// bookmark slot.
    #[instrument(level = "debug", skip(self))]
    pub async fn save_bookmark(&self) -> Result<ReadingPosition> {
        let snapshot = self.state().tracker.snapshot()?;
        self.tracker.save_bookmark(&snapshot).await?;
        self.notices.info("阅读进度已保存");
        Ok(snapshot)
    }

    /// Reopen the bookmarked document and, once it is in place, restore the
    /// bookmarked scroll offset.
    #[instrument(level = "debug", skip(self))]
    pub async fn load_bookmark(&self) -> Result<LoadOutcome> {
        let bookmark = self.tracker.load_bookmark().await?;
        self.replay(bookmark).await
    }

    /// Reopen where the previous session left off. `None` if it left nothing.
    #[instrument(level = "debug", skip(self))]
    pub async fn resume(&self) -> Result<Option<LoadOutcome>> {
        let Some(last) = self.tracker.restore().await? else {
            tracing::debug!("No position to resume");
            return Ok(None);
        };
        tracing::info!(identifier = %last.identifier, index = last.index(), "Resuming");
        self.replay(last).await.map(Some)
    }

    /// Load both listings, then resume.
    pub async fn start(&self) -> Result<Option<LoadOutcome>> {
        for (collection, result) in self.load_listings().await {
            if let Ok(documents) = result {
                tracing::debug!(%collection, documents, "Listing ready");
            }
        }
        self.resume().await
    }

    async fn replay(&self, target: ReadingPosition) -> Result<LoadOutcome> {
        let (document, position) = self.locate(target.collection(), &target.identifier, target.index());
        let (ticket, outcome) = self.load(document, position).await?;
        if !matches!(outcome, LoadOutcome::Applied(_)) {
            return Ok(outcome);
        }
        // The content has to be in place before the offset means anything.
        tokio::time::sleep(self.settings.restore_delay).await;
        let view = {
            let mut state = self.state();
            if state.latest != ticket {
                tracing::debug!(identifier = %target.identifier, "Skipping scroll restore of a replaced document");
                return Ok(LoadOutcome::Superseded);
            }
            state.tracker.scroll_to(target.scroll_offset);
            state.view().ok_or_raise(|| ErrorKind::NoActiveDocument)?
        };
        self.tracker.persist_scroll(target.scroll_offset).await?;
        Ok(LoadOutcome::Applied(view))
    }

    /// Drop every cached listing and document and the current position, then
    /// reload the listings from empty state. The bookmark survives.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear_all_cache(&self) -> Result<usize> {
        let preload = self.preload.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(preload) = preload {
            preload.abort();
        }
        let removed = self.retriever.clear().await?;
        {
            let mut state = self.state();
            // Bump the sequence so that loads still in flight are dropped.
            let latest = state.latest + 1;
            *state = State { latest, ..State::default() };
        }
        self.notices.info("缓存已清除");
        self.load_listings().await;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Level;
    use crate::testing::Fixture;
    use folio_fetch::Reply;
    use folio_storage::StateStore;
    use folio_storage::backend::MemoryStore;
    use folio_storage::keys;

    const CHAPTERS: [&str; 3] = ["第1章.txt", "第2章.txt", "第10章.txt"];
    const PROFILES: [&str; 2] = ["甲.txt", "乙.txt"];

    async fn ready() -> (Fixture, Session) {
        let fixture = Fixture::new();
        fixture.serve(Collection::Primary, &CHAPTERS);
        fixture.serve(Collection::Profile, &PROFILES);
        let session = fixture.session();
        for (_, result) in session.load_listings().await {
            result.unwrap();
        }
        (fixture, session)
    }

    fn applied(outcome: LoadOutcome) -> View {
        match outcome {
            LoadOutcome::Applied(view) => view,
            other => panic!("expected an applied load, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_listings_sorted_by_ordinal() {
        let (_fixture, session) = ready().await;
        let names: Vec<_> =
            session.listing(Collection::Primary).iter().map(|doc| doc.display_name.clone()).collect();
        assert_eq!(names, ["第1章", "第2章", "第10章"]);
        assert_eq!(session.listing(Collection::Profile).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_does_not_block_the_other() {
        let fixture = Fixture::new();
        fixture.serve(Collection::Primary, &CHAPTERS);
        fixture.transport.set_route(fixture.listing_url(Collection::Profile), [Reply::fail()]);
        let session = fixture.session();
        let results = session.load_listings().await;
        assert_eq!(*results[0].1.as_ref().unwrap(), 3);
        assert_eq!(**results[1].1.as_ref().unwrap_err(), ErrorKind::ListingUnavailable { collection: Collection::Profile });
        assert!(session.listing(Collection::Profile).is_empty());
        let notices = session.notices().settle().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, Level::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_document_transitions_and_persists() {
        let (fixture, session) = ready().await;
        assert!(session.current().is_none());
        let view = applied(session.load_document(Collection::Primary, 1).await.unwrap());
        assert_eq!(view.body, "body of chapters/第2章.txt");
        assert_eq!(view.origin, Origin::Network);
        assert_eq!(view.progress.to_string(), "第 2 章 / 共 3 章");
        assert_eq!(view.navigation, Navigation { previous: true, next: true });
        assert_eq!(session.current().unwrap().position, Position::Primary(1));

        let snapshot = fixture.store.snapshot().await;
        assert_eq!(snapshot[keys::LAST_DOCUMENT], "chapters/第2章.txt");
        assert_eq!(snapshot[keys::LAST_CHAPTER_INDEX], "1");
        assert_eq!(snapshot[keys::IS_CHARACTER], "false");
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_preloads_neighbors() {
        let (fixture, session) = ready().await;
        session.load_document(Collection::Primary, 1).await.unwrap();
        assert_eq!(session.settle_preload().await, Some(2));
        let listing = session.listing(Collection::Primary);
        for doc in [&listing.entries()[0], &listing.entries()[2]] {
            assert_eq!(fixture.transport.call_count(&fixture.document_url(doc)), 1);
        }
        // Navigation now hits the cache.
        let view = applied(session.navigate_next().await.unwrap());
        assert_eq!(view.origin, Origin::Cache);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profiles_are_not_preloaded() {
        let (fixture, session) = ready().await;
        session.load_document(Collection::Profile, 0).await.unwrap();
        assert_eq!(session.settle_preload().await, None);
        let profiles = session.listing(Collection::Profile);
        let other = &profiles.entries()[1];
        assert_eq!(fixture.transport.call_count(&fixture.document_url(other)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_position() {
        let (fixture, session) = ready().await;
        session.load_document(Collection::Primary, 0).await.unwrap();
        let broken = session.listing(Collection::Primary).entries()[2].clone();
        fixture.transport.set_route(fixture.document_url(&broken), [Reply::fail()]);
        session.settle_preload().await;

        let err = session.load_document(Collection::Primary, 2).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unavailable(broken.identifier.clone()));
        assert_eq!(session.current().unwrap().position, Position::Primary(0));
        assert_eq!(session.view().unwrap().document.display_name, "第1章");
        // Something is displayed, so no banner.
        assert!(session.notices().settle().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_load_posts_banner_until_recovery() {
        let (fixture, session) = ready().await;
        let first = session.listing(Collection::Primary).entries()[0].clone();
        fixture.transport.set_route(fixture.document_url(&first), [Reply::not_found()]);
        let err = session.load_document(Collection::Primary, 0).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(first.identifier.clone()));
        assert!(session.view().is_none());
        assert!(session.notices().visible().is_empty(), "errors are deferred");

        session.load_document(Collection::Primary, 1).await.unwrap();
        assert!(session.notices().settle().await.is_empty(), "a successful load dismisses pending errors");
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_out_of_range() {
        let (_fixture, session) = ready().await;
        let err = session.load_document(Collection::Primary, 3).await.unwrap_err();
        assert!(err.is_user_facing());
        assert_eq!(*err, ErrorKind::IndexOutOfRange { collection: Collection::Primary, index: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_boundaries() {
        let (_fixture, session) = ready().await;
        assert_eq!(*session.navigate_next().await.unwrap_err(), ErrorKind::NoActiveDocument);

        session.load_document(Collection::Primary, 0).await.unwrap();
        assert_eq!(session.navigate_previous().await.unwrap(), LoadOutcome::AtBoundary);
        assert_eq!(applied(session.navigate_next().await.unwrap()).position, Position::Primary(1));
        assert_eq!(applied(session.navigate_next().await.unwrap()).position, Position::Primary(2));
        assert_eq!(session.navigate_next().await.unwrap(), LoadOutcome::AtBoundary);
        assert_eq!(session.navigation(), Navigation { previous: true, next: false });
        assert_eq!(applied(session.navigate_previous().await.unwrap()).position, Position::Primary(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_stays_in_collection() {
        let (_fixture, session) = ready().await;
        session.load_document(Collection::Profile, 0).await.unwrap();
        let view = applied(session.navigate_next().await.unwrap());
        assert_eq!(view.position, Position::Profile(1));
        assert_eq!(view.progress.to_string(), "人物设定 2/2");
        assert_eq!(session.navigate_next().await.unwrap(), LoadOutcome::AtBoundary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_load_is_dropped() {
        let (fixture, session) = ready().await;
        let listing = session.listing(Collection::Primary);
        let slow = &listing.entries()[0];
        fixture.transport.set_route(fixture.document_url(slow), [Reply::delayed(Duration::from_secs(3), "slow")]);

        let (first, second) = tokio::join!(
            session.load_document(Collection::Primary, 0),
            session.load_document(Collection::Primary, 1),
        );
        assert_eq!(first.unwrap(), LoadOutcome::Superseded);
        assert_eq!(applied(second.unwrap()).position, Position::Primary(1));
        assert_eq!(session.current().unwrap().position, Position::Primary(1));
        assert_eq!(fixture.store.get(keys::LAST_CHAPTER_INDEX).await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_past_threshold_reads_ahead_once() {
        let (fixture, session) = ready().await;
        session.load_document(Collection::Primary, 0).await.unwrap();
        session.settle_preload().await;
        // Undo the neighbour preload so the scroll trigger has work to do.
        let next = session.listing(Collection::Primary).entries()[1].clone();
        fixture.store.remove(&folio_cache::document_key(&next)).await.unwrap();
        let next_url = fixture.document_url(&next);
        let before = fixture.transport.call_count(&next_url);

        assert!(!session.update_scroll(600, 1000).await.unwrap());
        assert!(session.update_scroll(700, 1000).await.unwrap());
        session.settle_preload().await;
        assert!(!session.update_scroll(900, 1000).await.unwrap());
        assert_eq!(fixture.transport.call_count(&next_url), before + 1);
        assert_eq!(fixture.store.get(keys::SCROLL_POSITION).await.unwrap().as_deref(), Some("900"));
        assert_eq!(session.current().unwrap().scroll_offset, 900);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_without_document_is_ignored() {
        let (fixture, session) = ready().await;
        assert!(!session.update_scroll(500, 1000).await.unwrap());
        assert_eq!(fixture.store.get(keys::SCROLL_POSITION).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bookmark_roundtrip_after_navigating_away() {
        let (_fixture, session) = ready().await;
        assert_eq!(*session.save_bookmark().await.unwrap_err(), ErrorKind::NoActiveDocument);
        assert_eq!(*session.load_bookmark().await.unwrap_err(), ErrorKind::NoBookmark);

        session.load_document(Collection::Primary, 2).await.unwrap();
        session.update_scroll(420, 2000).await.unwrap();
        let saved = session.save_bookmark().await.unwrap();
        assert_eq!(saved.scroll_offset, 420, "live offset, not the one from the load");

        session.load_document(Collection::Profile, 1).await.unwrap();
        session.update_scroll(10, 2000).await.unwrap();

        let start = tokio::time::Instant::now();
        let view = applied(session.load_bookmark().await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(500), "scroll restore waits for the content");
        assert_eq!(view.position, Position::Primary(2));
        assert_eq!(view.document.identifier, saved.identifier);
        assert_eq!(view.scroll_offset, 420);
        assert_eq!(session.current().unwrap(), saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bookmark_restore_skipped_when_replaced() {
        let (_fixture, session) = ready().await;
        session.load_document(Collection::Primary, 0).await.unwrap();
        session.update_scroll(300, 1000).await.unwrap();
        session.save_bookmark().await.unwrap();

        let (bookmark, other) = tokio::join!(session.load_bookmark(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            session.load_document(Collection::Primary, 1).await
        });
        assert_eq!(bookmark.unwrap(), LoadOutcome::Superseded);
        assert_eq!(applied(other.unwrap()).position, Position::Primary(1));
        assert_eq!(session.current().unwrap().scroll_offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_resumes_previous_session() {
        let fixture = Fixture::with_store(MemoryStore::with_entries([
            (keys::LAST_DOCUMENT, "chapters/第10章.txt"),
            (keys::LAST_CHAPTER_INDEX, "2"),
            (keys::IS_CHARACTER, "false"),
            (keys::SCROLL_POSITION, "1500"),
        ]));
        fixture.serve(Collection::Primary, &CHAPTERS);
        fixture.serve(Collection::Profile, &PROFILES);
        let session = fixture.session();
        let view = applied(session.start().await.unwrap().unwrap());
        assert_eq!(view.position, Position::Primary(2));
        assert_eq!(view.document.display_name, "第10章");
        assert_eq!(view.scroll_offset, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_finds_moved_document() {
        let fixture = Fixture::with_store(MemoryStore::with_entries([
            (keys::LAST_DOCUMENT, "chapters/第2章.txt"),
            (keys::LAST_CHAPTER_INDEX, "0"),
        ]));
        fixture.serve(Collection::Primary, &CHAPTERS);
        fixture.serve(Collection::Profile, &PROFILES);
        let session = fixture.session();
        let view = applied(session.start().await.unwrap().unwrap());
        assert_eq!(view.position, Position::Primary(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_history() {
        let (_fixture, session) = ready().await;
        assert_eq!(session.start().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_cache() {
        let (fixture, session) = ready().await;
        session.load_document(Collection::Primary, 0).await.unwrap();
        session.settle_preload().await;
        session.update_scroll(100, 1000).await.unwrap();
        session.save_bookmark().await.unwrap();
        let first = session.listing(Collection::Primary).entries()[0].clone();
        let first_url = fixture.document_url(&first);
        let listing_url = fixture.listing_url(Collection::Primary);

        assert!(session.clear_all_cache().await.unwrap() > 0);
        assert!(session.current().is_none());
        assert!(session.view().is_none());
        assert_eq!(session.listing(Collection::Primary).len(), 3, "listings are reloaded");
        assert_eq!(fixture.transport.call_count(&listing_url), 2);

        let remaining: Vec<_> = fixture.store.snapshot().await.into_keys().collect();
        assert!(remaining.contains(&keys::BOOKMARK.to_string()));
        assert!(!remaining.contains(&keys::LAST_DOCUMENT.to_string()));

        session.load_document(Collection::Primary, 0).await.unwrap();
        assert_eq!(fixture.transport.call_count(&first_url), 2, "documents go through the fetcher again");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_running_preload() {
        let (fixture, session) = ready().await;
        let next = session.listing(Collection::Primary).entries()[1].clone();
        fixture.transport.set_route(fixture.document_url(&next), [Reply::delayed(Duration::from_secs(2), "slow")]);
        session.load_document(Collection::Primary, 0).await.unwrap();

        session.clear_all_cache().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fixture.retriever.cache().contains_document(&next).await.unwrap());

        let view = applied(session.load_document(Collection::Primary, 1).await.unwrap());
        assert_eq!(view.origin, Origin::Network);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search() {
        let (_fixture, session) = ready().await;
        let hits = session.search("第1");
        let names: Vec<_> = hits.iter().map(|hit| hit.document.display_name.as_str()).collect();
        assert_eq!(names, ["第1章", "第10章"]);
        assert_eq!(session.search("人物设定").len(), 2);
        assert!(session.search("  ").is_empty());
    }
}
