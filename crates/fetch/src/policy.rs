use std::time::Duration;

/// Default number of attempts per fetch, the first one included.
pub const DEFAULT_ATTEMPTS: u32 = 3;
/// Delay before the first retry; doubled for every further retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
/// Deadline for a single attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Body GitHub's raw host serves in place of a missing file.
pub const DEFAULT_NOT_FOUND_SENTINEL: &str = "404: Not Found";

/// How hard a [`Fetcher`](crate::Fetcher) tries before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
    /// A success body containing this is treated as an invalid payload.
    pub not_found_sentinel: Option<String>,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            timeout: DEFAULT_TIMEOUT,
            not_found_sentinel: Some(DEFAULT_NOT_FOUND_SENTINEL.to_string()),
        }
    }
}
impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Delay to wait after the `failed`-th failed attempt (1-based).
    pub fn backoff(&self, failed: u32) -> Duration {
        let doublings = failed.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << doublings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1000)]
    #[case(2, 2000)]
    #[case(3, 4000)]
    fn test_backoff_doubles(#[case] failed: u32, #[case] millis: u64) {
        assert_eq!(RetryPolicy::default().backoff(failed), Duration::from_millis(millis));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy { attempts: 0, ..RetryPolicy::default() };
        assert_eq!(policy.max_attempts(), 1);
    }
}
