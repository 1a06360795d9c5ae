use std::sync::Arc;
use time::UtcDateTime;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

pub type ClockHandle = Arc<dyn Clock + Send + Sync>;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::manual::ManualClock;

#[cfg(any(test, feature = "mock"))]
mod manual {
    use super::Clock;
    use std::sync::Mutex;
    use time::{Duration, UtcDateTime};

    /// A clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<UtcDateTime>,
    }
    impl ManualClock {
        pub fn new(start: UtcDateTime) -> Self {
            Self { now: Mutex::new(start) }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }

        pub fn set(&self, to: UtcDateTime) {
            *self.now.lock().unwrap() = to;
        }
    }
    impl Default for ManualClock {
        /// Starts at 2024-01-01T00:00:00Z.
        fn default() -> Self {
            Self::new(UtcDateTime::from_unix_timestamp(1_704_067_200).unwrap())
        }
    }
    impl Clock for ManualClock {
        fn now(&self) -> UtcDateTime {
            *self.now.lock().unwrap()
        }
    }
}
