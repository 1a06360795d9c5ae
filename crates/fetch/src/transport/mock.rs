//! Scripted transport for testing.

use super::{Response, Transport};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer immediately with a status and body.
    Status(u16, String),
    /// Answer with a status and body after a delay.
    Delayed(Duration, u16, String),
    /// Fail to connect.
    Fail(String),
    /// Never answer.
    Hang,
}
impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Status(200, body.into())
    }

    pub fn not_found() -> Self {
        Self::Status(404, "404: Not Found".to_string())
    }

    pub fn fail() -> Self {
        Self::Fail("connection reset".to_string())
    }

    pub fn delayed(delay: Duration, body: impl Into<String>) -> Self {
        Self::Delayed(delay, 200, body.into())
    }
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub at: Instant,
}

/// Transport that answers from per-URL scripts.
///
/// Replies for a URL are consumed in order and the last one repeats forever.
/// URLs without a script answer with a 404. Every request is recorded
/// together with the (possibly paused) tokio clock reading.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the replies for `url`, builder style.
    pub fn route(self, url: impl Into<String>, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.set_route(url, replies);
        self
    }

    /// Replace the script for `url`.
    pub fn set_route(&self, url: impl Into<String>, replies: impl IntoIterator<Item = Reply>) {
        let replies: VecDeque<Reply> = replies.into_iter().collect();
        assert!(!replies.is_empty(), "MockTransport: a route needs at least one reply");
        self.routes.lock().unwrap().insert(url.into(), replies);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.url == url).count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Reply::not_found(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(&self, url: &str) -> Result<Response> {
        self.calls.lock().unwrap().push(Call { url: url.to_string(), at: Instant::now() });
        match self.next_reply(url) {
            Reply::Status(status, body) => Ok(Response::new(status, body)),
            Reply::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(Response::new(status, body))
            },
            Reply::Fail(reason) => exn::bail!(ErrorKind::Network(format!("{url}: {reason}"))),
            Reply::Hang => std::future::pending().await,
        }
    }
}
