//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Key is empty, contains separators, or would escape the store root.
    #[display("invalid key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Access denied to the underlying state directory.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Stored value is not valid UTF-8.
    #[display("stored value is not valid text: {_0:?}")]
    InvalidValue(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Store-specific error
    #[display("store error: {_0}")]
    StoreError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::InvalidKey("a/b".to_string()).to_string(), r#"invalid key: "a/b""#);
        assert_eq!(ErrorKind::StoreError("boom".to_string()).to_string(), "store error: boom");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Io(IoError::other("disk")).is_retryable());
        assert!(!ErrorKind::InvalidKey(String::new()).is_retryable());
    }
}
