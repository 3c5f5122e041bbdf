use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    time::{interval, Interval, MissedTickBehavior},
};

/// Gate in front of every provider dispatch. `wait` suspends until a token
/// is available; dropping the future abandons the wait, so cancellation
/// needs no extra plumbing.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn wait(&self);
}

/// Limiter for `rate_limit = 0`: tokens are always available.
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn wait(&self) {}
}

/// One token every `1s / rate`, never a zero period.
pub struct FixedRate {
    ticker: Mutex<Interval>,
}

impl FixedRate {
    pub fn new(rate: u32) -> Self {
        let period = (Duration::from_secs(1) / rate.max(1)).max(Duration::from_nanos(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        FixedRate { ticker: Mutex::new(ticker) }
    }
}

#[async_trait]
impl RateLimiter for FixedRate {
    async fn wait(&self) {
        self.ticker.lock().await.tick().await;
    }
}

pub fn rate_limiter_for(rate: u32) -> Box<dyn RateLimiter> {
    if rate == 0 {
        Box::new(Unlimited)
    } else {
        Box::new(FixedRate::new(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn unlimited_never_blocks() {
        let limiter = rate_limiter_for(0);
        for _ in 0..100 {
            limiter.wait().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_spaces_tokens() {
        let limiter = FixedRate::new(2);
        let started = Instant::now();
        // First token is immediate, the following two arrive 500ms apart.
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }
}
