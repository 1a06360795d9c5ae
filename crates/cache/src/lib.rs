//! Expiring local cache for listings and document bodies.
//!
//! Listings carry a time-to-live because new chapters keep appearing
//! upstream. Published document text is treated as immutable and is only
//! dropped by an explicit [`ExpiringCache::clear_all`].

mod cache;
mod clock;
pub mod error;

pub use crate::cache::{DEFAULT_LISTING_TTL, ExpiringCache, document_key, listing_key};
#[cfg(any(test, feature = "mock"))]
pub use crate::clock::ManualClock;
pub use crate::clock::{Clock, ClockHandle, SystemClock};
pub use folio_catalog::dedupe;
