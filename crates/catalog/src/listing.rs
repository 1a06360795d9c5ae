use crate::consts::DOCUMENT_SUFFIX;
use crate::models::{Collection, DocumentRef};
use crate::ordinal::parse_ordinal;
use serde::Deserialize;
use std::collections::HashSet;

/// One element of the remote directory listing.
///
/// The listing API returns far more fields than this; everything else is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
}
impl RemoteEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), path: path.into() }
    }

    /// Only `.txt` entries are documents.
    pub fn is_document(&self) -> bool {
        self.name.ends_with(DOCUMENT_SUFFIX)
    }
}

/// Anything that can be de-duplicated by a case-insensitive name.
pub trait DedupeKey {
    fn dedupe_key(&self) -> &str;
}
impl DedupeKey for &str {
    fn dedupe_key(&self) -> &str {
        self
    }
}
impl DedupeKey for String {
    fn dedupe_key(&self) -> &str {
        self
    }
}
impl DedupeKey for RemoteEntry {
    fn dedupe_key(&self) -> &str {
        &self.name
    }
}
impl DedupeKey for DocumentRef {
    fn dedupe_key(&self) -> &str {
        &self.identifier
    }
}

/// Drop every entry whose case-insensitive name was already seen earlier,
/// keeping first-occurrence order.
///
/// Guards against the upstream listing API repeating a leading entry.
///
/// ```
/// use folio_catalog::dedupe;
/// assert_eq!(dedupe(["ch1.txt", "Ch1.txt", "ch2.txt"]), vec!["ch1.txt", "ch2.txt"]);
/// ```
pub fn dedupe<T: DedupeKey>(entries: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    entries.into_iter().filter(|entry| seen.insert(entry.dedupe_key().to_lowercase())).collect()
}

/// Ordered, de-duplicated documents of one collection.
///
/// Entries with a chapter ordinal come first in ordinal order; the rest
/// follow in lexicographic order of their display name. A refresh replaces
/// the whole listing, it is never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    collection: Collection,
    entries: Vec<DocumentRef>,
}
impl Listing {
    /// Build a listing, de-duplicating and sorting `entries`.
    ///
    /// Entries belonging to another collection are dropped.
    pub fn new(collection: Collection, entries: impl IntoIterator<Item = DocumentRef>) -> Self {
        let mut entries = dedupe(entries.into_iter().filter(|doc| {
            if doc.collection != collection {
                tracing::debug!(identifier = %doc.identifier, %collection, "Dropping entry from another collection");
            }
            doc.collection == collection
        }));
        entries.sort_by_cached_key(|doc| {
            let ordinal = parse_ordinal(&doc.display_name);
            (ordinal.is_none(), ordinal.unwrap_or_default(), doc.display_name.clone())
        });
        Self { collection, entries }
    }

    /// Build a listing from the raw remote directory listing.
    ///
    /// ```
    /// use folio_catalog::{Collection, Listing, RemoteEntry};
    /// let listing = Listing::from_remote(Collection::Primary, [
    ///     RemoteEntry::new("第10章.txt", "chapters/第10章.txt"),
    ///     RemoteEntry::new("第2章.txt", "chapters/第2章.txt"),
    ///     RemoteEntry::new("cover.png", "chapters/cover.png"),
    /// ]);
    /// let names: Vec<_> = listing.iter().map(|d| d.display_name.as_str()).collect();
    /// assert_eq!(names, ["第2章", "第10章"]);
    /// ```
    pub fn from_remote(collection: Collection, entries: impl IntoIterator<Item = RemoteEntry>) -> Self {
        let documents = dedupe(entries.into_iter().filter(RemoteEntry::is_document))
            .into_iter()
            .map(|entry| DocumentRef::from_path(collection, entry.path));
        Self::new(collection, documents)
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn entries(&self) -> &[DocumentRef] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DocumentRef> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DocumentRef> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentRef> {
        self.entries.iter()
    }

    /// Listing index of a document identifier.
    pub fn position_of(&self, identifier: &str) -> Option<usize> {
        self.entries.iter().position(|doc| doc.identifier == identifier)
    }

    /// The in-range immediate neighbours of `index`, previous first.
    pub fn neighbors(&self, index: usize) -> Vec<(usize, &DocumentRef)> {
        [index.checked_sub(1), index.checked_add(1)]
            .into_iter()
            .flatten()
            .filter_map(|i| self.get(i).map(|doc| (i, doc)))
            .collect()
    }
}
impl<'a> IntoIterator for &'a Listing {
    type Item = &'a DocumentRef;
    type IntoIter = std::slice::Iter<'a, DocumentRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
