//! Single-shot remote reads.
//!
//! A [`Transport`] performs exactly one GET and reports what the host said.
//! Retries, timeouts and payload validation all live in
//! [`Fetcher`](crate::Fetcher), so every transport gets them for free.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{Call, MockTransport, Reply};
use crate::error::Result;
use async_trait::async_trait;

/// What the host answered, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}
impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Name used in log events.
    fn name(&self) -> &str;

    /// Perform one GET.
    ///
    /// Only failures to obtain a response at all are errors; every HTTP
    /// status, including 404, comes back as a [`Response`].
    async fn get(&self, url: &str) -> Result<Response>;
}
