//! Upload rate limiting

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as Governor};

/// A shared gate admitting at most `slots` callers per second. Slots refill
/// continuously, so waiters are released in turn as time advances.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
}

impl RateLimiter {
    pub fn new(slots: u32) -> Self {
        let slots = NonZeroU32::new(slots).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Governor::direct(Quota::per_second(slots)),
        }
    }

    /// Wait until it is safe to proceed
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
