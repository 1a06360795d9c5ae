//! Document references, listings and their ordering.
//!
//! A [`Listing`] is the ordered set of [`DocumentRef`]s for one
//! [`Collection`]. Ordering comes from the chapter ordinal embedded in each
//! title ([`parse_ordinal`]), falling back to lexicographic order of the
//! display name when a title carries no ordinal.

mod consts;
mod listing;
mod models;
mod ordinal;
mod search;

pub use crate::listing::{DedupeKey, Listing, RemoteEntry, dedupe};
pub use crate::models::{Collection, DocumentRef};
pub use crate::ordinal::parse_ordinal;
pub use crate::search::{SearchHit, search};
