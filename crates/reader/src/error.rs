//! Reader Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use folio_catalog::Collection;

/// A reader error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote host says the document does not exist.
    #[display("document not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The document could not be fetched within the retry budget.
    #[display("document unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The listing could not be fetched within the retry budget.
    #[display("{collection} listing unavailable")]
    ListingUnavailable { collection: Collection },
    /// There is no document at this listing index.
    #[display("no {collection} document at index {index}")]
    IndexOutOfRange { collection: Collection, index: usize },
    #[display("no document is open")]
    NoActiveDocument,
    #[display("no bookmark saved")]
    NoBookmark,
    /// The persisted state could not be read or written.
    #[display("state store error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::ListingUnavailable { .. } | Self::Storage)
    }

    /// Precondition failures of a user action.
    ///
    /// These are shown to the user as a plain message and never logged as
    /// failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::NoActiveDocument | Self::NoBookmark | Self::IndexOutOfRange { .. })
    }
}
