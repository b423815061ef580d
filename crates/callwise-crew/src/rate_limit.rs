//! Requests-per-minute limiting by minimum spacing between calls

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between successive acquisitions
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allow at most `max_rpm` calls per minute; 0 disables the limit
    #[must_use]
    pub fn per_minute(max_rpm: u32) -> Self {
        let interval = if max_rpm == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / max_rpm
        };
        Self::with_interval(interval)
    }

    /// Limiter with an explicit spacing
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Minimum spacing between calls
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call is allowed, then record it
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "rate limit reached, waiting"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_rpm() {
        assert_eq!(RateLimiter::per_minute(5).interval(), Duration::from_secs(12));
        assert_eq!(RateLimiter::per_minute(10).interval(), Duration::from_secs(6));
        assert_eq!(RateLimiter::per_minute(0).interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_acquire_spaces_calls() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(20));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::per_minute(1);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
