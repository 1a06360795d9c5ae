//! The reading engine.
//!
//! A requested document is looked up in the [`ExpiringCache`](folio_cache::ExpiringCache),
//! fetched on a miss, recorded as the current [`ReadingPosition`] and then
//! its neighbours are warmed in the background by the [`Preloader`]. The
//! [`Session`] ties these together behind the operations a front end calls.

pub mod error;
mod notice;
mod position;
mod preload;
mod progress;
mod retriever;
mod session;
#[cfg(test)]
mod testing;

pub use crate::notice::{DEFAULT_NOTICE_DELAY, Level, Notice, NoticeBoard};
pub use crate::position::{Position, PositionTracker, ReadingPosition, TrackerState};
pub use crate::preload::Preloader;
pub use crate::progress::{Navigation, Progress};
pub use crate::retriever::{Fetched, Origin, Retriever};
pub use crate::session::{LoadOutcome, ReaderSettings, Session, View};
