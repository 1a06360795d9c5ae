//! User-visible messages that only surface after a short grace period.
//!
//! Transient failures often recover on their own within a few hundred
//! milliseconds; a notice posted and then dismissed inside the delay is
//! never seen.

use derive_more::Display;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_NOTICE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    #[display("info")]
    Info,
    #[display("error")]
    Error,
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{message}")]
pub struct Notice {
    pub level: Level,
    pub message: String,
    posted_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    delay: Duration,
    pending: Mutex<Vec<Notice>>,
}
impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_DELAY)
    }
}
impl NoticeBoard {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(Vec::new()) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn post(&self, level: Level, message: impl Into<String>) {
        let notice = Notice { level, message: message.into(), posted_at: Instant::now() };
        tracing::debug!(%level, message = %notice.message, "Notice posted");
        self.lock().push(notice);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(Level::Error, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.post(Level::Info, message);
    }

    /// Withdraw every error notice, shown or not.
    pub fn dismiss_errors(&self) {
        self.lock().retain(|notice| notice.level != Level::Error);
    }

    /// Notices whose grace period has elapsed, oldest first.
    pub fn visible(&self) -> Vec<Notice> {
        let now = Instant::now();
        self.lock().iter().filter(|notice| notice.posted_at + self.delay <= now).cloned().collect()
    }

    /// Wait until every pending notice is visible, then remove and return them.
    pub async fn settle(&self) -> Vec<Notice> {
        let latest = self.lock().iter().map(|notice| notice.posted_at).max();
        if let Some(latest) = latest {
            tokio::time::sleep_until(latest + self.delay).await;
        }
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notice_hidden_until_delay() {
        let board = NoticeBoard::default();
        board.error("加载失败");
        assert!(board.visible().is_empty());
        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(board.visible().is_empty());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(board.visible().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_dismisses_errors_before_they_show() {
        let board = NoticeBoard::default();
        board.error("network hiccup");
        board.info("cache cleared");
        tokio::time::advance(Duration::from_millis(100)).await;
        board.dismiss_errors();
        tokio::time::advance(Duration::from_millis(500)).await;
        let visible = board.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].level, Level::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_waits_and_drains() {
        let board = NoticeBoard::new(Duration::from_millis(300));
        board.error("a");
        let start = Instant::now();
        let notices = board.settle().await;
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(notices.iter().map(ToString::to_string).collect::<Vec<_>>(), ["a"]);
        assert!(board.settle().await.is_empty());
    }
}
