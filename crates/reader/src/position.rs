//! Where the reader is.
//!
//! The tracker is a two-state machine: [`TrackerState::NoPosition`] until the
//! first successful document load, [`TrackerState::Viewing`] afterwards. A
//! failed load never transitions. The current position is persisted under
//! the same keys a previous session left it in, and the bookmark is a JSON
//! snapshot in a separate slot.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_catalog::Collection;
use folio_storage::{StoreHandle, keys};
use serde::{Deserialize, Deserializer, Serialize};

/// Listing index within exactly one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Primary(usize),
    Profile(usize),
}
impl Position {
    pub fn new(collection: Collection, index: usize) -> Self {
        match collection {
            Collection::Primary => Self::Primary(index),
            Collection::Profile => Self::Profile(index),
        }
    }

    pub fn collection(self) -> Collection {
        match self {
            Self::Primary(_) => Collection::Primary,
            Self::Profile(_) => Collection::Profile,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Primary(index) | Self::Profile(index) => index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingPosition {
    pub position: Position,
    /// Remote path of the document.
    pub identifier: String,
    pub scroll_offset: u64,
}
impl ReadingPosition {
    pub fn collection(&self) -> Collection {
        self.position.collection()
    }

    pub fn index(&self) -> usize {
        self.position.index()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackerState {
    #[default]
    NoPosition,
    Viewing(ReadingPosition),
}
impl TrackerState {
    /// A document finished loading.
    pub fn view(&mut self, position: ReadingPosition) {
        *self = Self::Viewing(position);
    }

    /// Record the live scroll offset. Ignored without a position.
    pub fn scroll_to(&mut self, offset: u64) -> bool {
        match self {
            Self::Viewing(current) => {
                current.scroll_offset = offset;
                true
            },
            Self::NoPosition => false,
        }
    }

    pub fn current(&self) -> Option<&ReadingPosition> {
        match self {
            Self::Viewing(current) => Some(current),
            Self::NoPosition => None,
        }
    }

    /// Snapshot for a bookmark, including the live scroll offset.
    pub fn snapshot(&self) -> Result<ReadingPosition> {
        match self {
            Self::Viewing(current) => Ok(current.clone()),
            Self::NoPosition => exn::bail!(ErrorKind::NoActiveDocument),
        }
    }
}

/// On-disk bookmark layout.
///
/// Both index fields exist for compatibility; only the one matching
/// `isCharacterChapter` is meaningful.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkRecord {
    chapter: String,
    #[serde(deserialize_with = "lenient_offset")]
    position: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chapter_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    character_index: Option<usize>,
    #[serde(default)]
    is_character_chapter: bool,
}
impl From<&ReadingPosition> for BookmarkRecord {
    fn from(current: &ReadingPosition) -> Self {
        let (chapter_index, character_index) = match current.position {
            Position::Primary(index) => (Some(index), None),
            Position::Profile(index) => (None, Some(index)),
        };
        Self {
            chapter: current.identifier.clone(),
            position: current.scroll_offset,
            chapter_index,
            character_index,
            is_character_chapter: matches!(current.position, Position::Profile(_)),
        }
    }
}
impl From<BookmarkRecord> for ReadingPosition {
    fn from(record: BookmarkRecord) -> Self {
        let position = if record.is_character_chapter {
            Position::Profile(record.character_index.unwrap_or_default())
        } else {
            Position::Primary(record.chapter_index.unwrap_or_default())
        };
        Self { position, identifier: record.chapter, scroll_offset: record.position }
    }
}

/// Scroll offsets written by a browser may be fractional or negative.
fn lenient_offset<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let offset = f64::deserialize(deserializer)?;
    Ok(if offset.is_finite() && offset > 0.0 { offset.round() as u64 } else { 0 })
}

/// Persists the current position and the bookmark.
#[derive(Clone)]
pub struct PositionTracker {
    store: StoreHandle,
}
impl PositionTracker {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value).await.or_raise(|| ErrorKind::Storage)
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await.or_raise(|| ErrorKind::Storage)
    }

    /// Persist `current` as the position to resume from.
    ///
    /// The index of the other collection is left untouched.
    pub async fn persist(&self, current: &ReadingPosition) -> Result<()> {
        let (index_key, is_character) = match current.position {
            Position::Primary(_) => (keys::LAST_CHAPTER_INDEX, false),
            Position::Profile(_) => (keys::LAST_CHARACTER_INDEX, true),
        };
        self.write(keys::LAST_DOCUMENT, &current.identifier).await?;
        self.write(index_key, &current.index().to_string()).await?;
        self.write(keys::IS_CHARACTER, &is_character.to_string()).await?;
        self.persist_scroll(current.scroll_offset).await
    }

    pub async fn persist_scroll(&self, offset: u64) -> Result<()> {
        self.write(keys::SCROLL_POSITION, &offset.to_string()).await
    }

    /// The position a previous session left off at, if any.
    ///
    /// Unparseable indices and offsets read as 0.
    pub async fn restore(&self) -> Result<Option<ReadingPosition>> {
        let Some(identifier) = self.read(keys::LAST_DOCUMENT).await?.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let is_character = self.read(keys::IS_CHARACTER).await?.is_some_and(|flag| flag == "true");
        let index_key = if is_character { keys::LAST_CHARACTER_INDEX } else { keys::LAST_CHAPTER_INDEX };
        let index = self.read(index_key).await?.and_then(|raw| raw.trim().parse().ok()).unwrap_or(0);
        let scroll_offset = self.read(keys::SCROLL_POSITION).await?.and_then(|raw| raw.trim().parse().ok()).unwrap_or(0);
        let collection = if is_character { Collection::Profile } else { Collection::Primary };
        Ok(Some(ReadingPosition { position: Position::new(collection, index), identifier, scroll_offset }))
    }

    pub async fn save_bookmark(&self, bookmark: &ReadingPosition) -> Result<()> {
        let raw = serde_json::to_string(&BookmarkRecord::from(bookmark)).or_raise(|| ErrorKind::Storage)?;
        self.write(keys::BOOKMARK, &raw).await?;
        tracing::debug!(identifier = %bookmark.identifier, scroll = bookmark.scroll_offset, "Saved bookmark");
        Ok(())
    }

    /// The saved bookmark. A missing or unreadable one is [`ErrorKind::NoBookmark`].
    pub async fn load_bookmark(&self) -> Result<ReadingPosition> {
        let Some(raw) = self.read(keys::BOOKMARK).await? else {
            exn::bail!(ErrorKind::NoBookmark);
        };
        match serde_json::from_str::<BookmarkRecord>(&raw) {
            Ok(record) => Ok(record.into()),
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring unreadable bookmark");
                exn::bail!(ErrorKind::NoBookmark)
            },
        }
    }
}
