//! Title search across listings.
//!
//! Matching is a plain case-insensitive substring test against the display
//! name or the collection label; there is no ranking.

use crate::listing::Listing;
use crate::models::{Collection, DocumentRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub collection: Collection,
    /// Index of the document within its listing.
    pub index: usize,
    pub document: DocumentRef,
}

/// Find every document whose title or collection label contains `query`.
///
/// Hits are returned listing by listing, in listing order. A blank query
/// matches nothing.
pub fn search<'a>(query: &str, listings: impl IntoIterator<Item = &'a Listing>) -> Vec<SearchHit> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let query = query.as_str();
    listings
        .into_iter()
        .flat_map(|listing| {
            let label_matches = listing.collection().label().to_lowercase().contains(query);
            listing.iter().enumerate().filter_map(move |(index, doc)| {
                (label_matches || doc.display_name.to_lowercase().contains(query)).then(|| SearchHit {
                    collection: listing.collection(),
                    index,
                    document: doc.clone(),
                })
            })
        })
        .collect()
}
