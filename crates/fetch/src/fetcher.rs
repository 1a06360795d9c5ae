use crate::error::{ErrorKind, Result};
use crate::policy::RetryPolicy;
use crate::TransportHandle;
use exn::ResultExt;
use serde::de::DeserializeOwned;
use tracing::instrument;

/// Remote reads with bounded retries.
///
/// Each attempt is bounded by [`RetryPolicy::timeout`]. Failed attempts are
/// retried after an exponentially growing delay until
/// [`RetryPolicy::attempts`] is exhausted, except when the host reports the
/// resource as not found, which fails immediately.
#[derive(Clone)]
pub struct Fetcher {
    transport: TransportHandle,
    policy: RetryPolicy,
}
impl Fetcher {
    pub fn new(transport: TransportHandle) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: TransportHandle, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch a text body.
    ///
    /// The body is returned as-is; empty bodies and the host's "not found"
    /// page are rejected.
    #[instrument(level = "debug", skip(self), fields(transport = self.transport.name()))]
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        self.fetch_with_retries(url, |_, body| Ok(body)).await
    }

    /// Fetch and decode a JSON body.
    ///
    /// Decoding is part of each attempt, so a transient error page in place
    /// of the JSON is retried like any other failed attempt.
    #[instrument(level = "debug", skip(self), fields(transport = self.transport.name()))]
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.fetch_with_retries(url, |url, body| {
            serde_json::from_str(&body).or_raise(|| ErrorKind::Decode(url.to_string()))
        })
        .await
    }

    async fn fetch_with_retries<T>(&self, url: &str, decode: impl Fn(&str, String) -> Result<T>) -> Result<T> {
        let attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            let err = match self.attempt(url).await {
                Ok(body) => {
                    let bytes = body.len();
                    match decode(url, body) {
                        Ok(value) => {
                            tracing::debug!(url, attempt, bytes, "Fetched");
                            return Ok(value);
                        },
                        Err(err) => err,
                    }
                },
                Err(err) => err,
            };
            let kind: &ErrorKind = &err;
            if !kind.is_retryable() {
                tracing::debug!(url, attempt, error = %kind, "Not retrying");
                return Err(err);
            }
            if attempt >= attempts {
                tracing::warn!(url, attempts, error = %kind, "Giving up");
                return Err(err);
            }
            let delay = self.policy.backoff(attempt);
            tracing::warn!(url, attempt, delay_ms = delay.as_millis() as u64, error = %kind, "Fetch failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let response = match tokio::time::timeout(self.policy.timeout, self.transport.get(url)).await {
            Ok(response) => response?,
            Err(_) => exn::bail!(ErrorKind::Timeout(url.to_string())),
        };
        if response.status == 404 {
            exn::bail!(ErrorKind::NotFound(url.to_string()));
        }
        if !response.is_success() {
            exn::bail!(ErrorKind::Network(format!("HTTP {} from {url}", response.status)));
        }
        if response.body.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidPayload(format!("empty body from {url}")));
        }
        if let Some(sentinel) = self.policy.not_found_sentinel.as_deref()
            && response.body.contains(sentinel)
        {
            exn::bail!(ErrorKind::InvalidPayload(format!("error page from {url}")));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, Reply};
    use serde::Deserialize;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const URL: &str = "https://raw.example/chapters/1.txt";

    fn fetcher(transport: &Arc<MockTransport>) -> Fetcher {
        Fetcher::new(transport.clone())
    }

    fn gaps(transport: &MockTransport) -> Vec<Duration> {
        let calls = transport.calls();
        calls.windows(2).map(|pair| pair[1].at - pair[0].at).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_succeeds() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("第一章")]));
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "第一章");
        assert_eq!(transport.call_count(URL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_second_attempt() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::fail(), Reply::ok("body")]));
        let start = Instant::now();
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "body");
        assert_eq!(transport.call_count(URL), 2);
        assert_eq!(gaps(&transport), [Duration::from_secs(1)]);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_attempts_with_backoff() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::fail()]));
        let err = fetcher(&transport).fetch_text(URL).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert_eq!(transport.call_count(URL), 3);
        assert_eq!(gaps(&transport), [Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_terminal() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::not_found()]));
        let err = fetcher(&transport).fetch_text(URL).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert_eq!(transport.call_count(URL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_retried() {
        let transport = Arc::new(MockTransport::new().route(
            URL,
            [Reply::Status(503, "busy".into()), Reply::Status(502, "bad".into()), Reply::ok("done")],
        ));
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "done");
        assert_eq!(transport.call_count(URL), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_body_is_invalid() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("  \n")]));
        let err = fetcher(&transport).fetch_text(URL).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPayload(_)));
        assert_eq!(transport.call_count(URL), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentinel_body_is_invalid() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("404: Not Found"), Reply::ok("text")]));
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "text");
        assert_eq!(transport.call_count(URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentinel_can_be_disabled() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("404: Not Found")]));
        let policy = RetryPolicy { not_found_sentinel: None, ..RetryPolicy::default() };
        let body = Fetcher::with_policy(transport.clone(), policy).fetch_text(URL).await.unwrap();
        assert_eq!(body, "404: Not Found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_every_attempt() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::Hang]));
        let start = Instant::now();
        let err = fetcher(&transport).fetch_text(URL).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout(_)));
        assert_eq!(transport.call_count(URL), 3);
        // 10s + 1s + 10s + 2s + 10s
        assert_eq!(start.elapsed(), Duration::from_secs(33));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_success() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::Hang, Reply::ok("late")]));
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "late");
        assert_eq!(gaps(&transport), [Duration::from_secs(11)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_within_deadline() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::delayed(Duration::from_secs(9), "slow")]));
        assert_eq!(fetcher(&transport).fetch_text(URL).await.unwrap(), "slow");
        assert_eq!(transport.call_count(URL), 1);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entry {
        name: String,
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_json() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok(r#"[{"name":"a.txt","size":3}]"#)]));
        let entries: Vec<Entry> = fetcher(&transport).fetch_json(URL).await.unwrap();
        assert_eq!(entries, vec![Entry { name: "a.txt".into() }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failure_is_retried() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("<html>oops</html>"), Reply::ok("[]")]));
        let entries: Vec<Entry> = fetcher(&transport).fetch_json(URL).await.unwrap();
        assert!(entries.is_empty());
        assert_eq!(transport.call_count(URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failure_exhausts_attempts() {
        let transport = Arc::new(MockTransport::new().route(URL, [Reply::ok("<html>rate limited</html>")]));
        let err = fetcher(&transport).fetch_json::<Vec<Entry>>(URL).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
        assert_eq!(transport.call_count(URL), 3);
        assert_eq!(gaps(&transport), [Duration::from_secs(1), Duration::from_secs(2)]);
    }
}
