//! Token-bucket rate limiting for exchange requests

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

/// Token-bucket rate limiter: at most `rate` requests per refill window.
///
/// Permits are consumed on acquire and topped back up once the window
/// has elapsed. Clones share the same bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    rate: usize,
    window: Duration,
    last_refill: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Limit to `rate` requests per second
    pub fn per_second(rate: usize) -> Self {
        Self::new(rate, Duration::from_secs(1))
    }

    pub fn new(rate: usize, window: Duration) -> Self {
        RateLimiter {
            permits: Arc::new(Semaphore::new(rate)),
            rate,
            window,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Wait until a request slot is free, then consume it
    pub async fn acquire(&self) {
        self.refill_if_due().await;

        let permit = self
            .permits
            .acquire()
            .await
            .expect("rate limiter semaphore closed");
        permit.forget();
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn refill_if_due(&self) {
        let mut last = self.last_refill.lock().await;
        if last.elapsed() >= self.window {
            let missing = self.rate.saturating_sub(self.permits.available_permits());
            if missing > 0 {
                self.permits.add_permits(missing);
            }
            *last = Instant::now();
        }
    }
}
