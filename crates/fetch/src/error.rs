//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The host explicitly reported that the resource does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Connection failure or unexpected HTTP status.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// No response within the per-attempt deadline.
    #[display("timed out: {_0}")]
    Timeout(#[error(not(source))] String),
    /// A success status carrying an empty body or the host's error page.
    #[display("invalid payload: {_0}")]
    InvalidPayload(#[error(not(source))] String),
    /// The body was fetched but is not the expected JSON shape.
    #[display("malformed response: {_0}")]
    Decode(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Everything except an explicit "not found".
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}
