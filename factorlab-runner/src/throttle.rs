//! Minimum-gap pacing between consecutive upstream requests.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Blocks callers so that consecutive `acquire` calls are at least
/// `min_delay` apart.
pub struct RateLimiter {
    min_delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait out the remainder of the gap, then stamp the request.
    /// Returns how long the caller slept.
    pub fn acquire(&self) -> Duration {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let waited = match *last {
            Some(prev) => {
                let elapsed = prev.elapsed();
                if elapsed < self.min_delay {
                    let remaining = self.min_delay - elapsed;
                    std::thread::sleep(remaining);
                    remaining
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        *last = Some(Instant::now());
        waited
    }
}
