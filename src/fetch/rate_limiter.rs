//! Sliding-window rate limiting for API requests.
//!
//! [`RateLimiter`] hands out at most `permits` acquisitions in any rolling
//! `window`. It is shared behind `Arc` by every concurrent page fetch, so the
//! bookkeeping sits in a `tokio::sync::Mutex` and is never held across a sleep.
//!
//! ```
//! use std::time::Duration;
//! use acres_scout::fetch::RateLimiter;
//!
//! # tokio_test::block_on(async {
//! let limiter = RateLimiter::new(5, Duration::from_secs(2));
//! limiter.acquire().await;
//! assert_eq!(limiter.in_window().await, 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Permits-per-window limiter shared across concurrent requests.
#[derive(Debug)]
pub struct RateLimiter {
    permits: usize,
    window: Duration,
    /// Grant times inside the current window, oldest first.
    granted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `permits` is clamped to at least one.
    pub fn new(permits: u32, window: Duration) -> Self {
        let permits = usize::try_from(permits.max(1)).unwrap_or(usize::MAX);
        Self {
            permits,
            window,
            granted: Mutex::new(VecDeque::with_capacity(permits)),
        }
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a permit is free in the rolling window, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut granted = self.granted.lock().await;
                let now = Instant::now();
                prune(&mut granted, now, self.window);

                if granted.len() < self.permits {
                    granted.push_back(now);
                    return;
                }

                match granted.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Permits granted within the current window.
    pub async fn in_window(&self) -> usize {
        let mut granted = self.granted.lock().await;
        prune(&mut granted, Instant::now(), self.window);
        granted.len()
    }
}

fn prune(granted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = granted.front() {
        if now.duration_since(*oldest) >= window {
            granted.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        let start = std::time::Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.in_window().await, 5);
    }

    #[tokio::test]
    async fn test_excess_request_waits_for_window() {
        let window = Duration::from_millis(150);
        let limiter = RateLimiter::new(2, window);
        let start = std::time::Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= window);
    }

    #[tokio::test]
    async fn test_concurrent_acquisition_respects_capacity() {
        let window = Duration::from_millis(200);
        let limiter = Arc::new(RateLimiter::new(3, window));
        let start = std::time::Instant::now();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // six grants at three per window need at least one full window
        assert!(start.elapsed() >= window);
        assert!(limiter.in_window().await <= 3);
    }

    #[test]
    fn test_zero_permits_clamped() {
        assert_eq!(RateLimiter::new(0, Duration::from_secs(1)).permits(), 1);
    }
}
