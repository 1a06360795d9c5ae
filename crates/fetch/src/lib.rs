pub mod error;
mod fetcher;
mod policy;
pub mod transport;

pub use crate::fetcher::Fetcher;
pub use crate::policy::{
    DEFAULT_ATTEMPTS, DEFAULT_INITIAL_BACKOFF, DEFAULT_NOT_FOUND_SENTINEL, DEFAULT_TIMEOUT, RetryPolicy,
};
pub use crate::transport::{HttpTransport, Response, Transport};
#[cfg(any(test, feature = "mock"))]
pub use crate::transport::{MockTransport, Reply};
use std::sync::Arc;

pub type TransportHandle = Arc<dyn Transport + Send + Sync>;
