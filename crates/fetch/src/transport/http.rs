use super::{Response, Transport};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;

/// HTTP(S) transport backed by a shared [`reqwest::Client`].
///
/// The client carries no timeout of its own; the per-attempt deadline is
/// enforced by [`Fetcher`](crate::Fetcher) so that it also covers the body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}
impl HttpTransport {
    /// GitHub's API rejects requests without a user agent.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .or_raise(|| ErrorKind::Network("failed to create HTTP client".to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        tracing::trace!(url, status, bytes = body.len(), "Received response");
        Ok(Response::new(status, body))
    }
}
