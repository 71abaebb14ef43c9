//! Shared delay policy for outbound requests.
//!
//! Wraps the governor crate as a minimum-interval limiter; every adapter
//! request to the same source waits on its source's throttle.

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Minimum-interval request throttle, cheap to clone and share.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<DefaultRateLimiter>,
}

impl Throttle {
    /// Create a throttle enforcing one request per interval.
    pub fn from_interval_ms(interval_ms: u64) -> Self {
        let quota = Quota::with_period(Duration::from_millis(interval_ms.max(1)))
            .expect("interval must be positive")
            .allow_burst(nonzero!(1u32));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create a throttle allowing `per_second` requests per second.
    pub fn per_second(per_second: u32) -> Self {
        let quota =
            Quota::per_second(NonZeroU32::new(per_second).expect("rate must be positive"));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn enforces_minimum_interval() {
        let throttle = Throttle::from_interval_ms(50);

        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        let elapsed = start.elapsed();

        // First permit is immediate, the next two wait ~50ms each
        assert!(elapsed.as_millis() >= 90, "throttle too fast: {elapsed:?}");
    }

    #[tokio::test]
    async fn clones_share_the_budget() {
        let throttle = Throttle::from_interval_ms(50);
        let clone = throttle.clone();

        let start = Instant::now();
        throttle.acquire().await;
        clone.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed.as_millis() >= 40, "clone bypassed throttle: {elapsed:?}");
    }
}
