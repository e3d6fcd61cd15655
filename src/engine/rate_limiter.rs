use {
    crate::{config::TRADING, utils::Clock},
    std::{collections::HashMap, sync::Arc, time::Duration},
    tokio::sync::Mutex,
};

/// Per-user gate on trade-creation attempts.
#[derive(Clone)]
pub struct TradeRateLimiter {
    inner: Arc<Mutex<InnerLimiter>>,
    clock: Arc<dyn Clock>,
    // Tracked users before `check` sweeps out expired entries
    prune_at: usize,
}

struct InnerLimiter {
    window_ms: i64,
    // Last attempt per user that got through the gate
    last_attempt: HashMap<String, i64>,
}

impl InnerLimiter {
    fn prune_expired(&mut self, now: i64) -> usize {
        let window_ms = self.window_ms;
        let before = self.last_attempt.len();
        self.last_attempt.retain(|_, last| now - *last < window_ms);
        before - self.last_attempt.len()
    }
}

impl TradeRateLimiter {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerLimiter {
                window_ms: window.as_millis() as i64,
                last_attempt: HashMap::new(),
            })),
            clock,
            prune_at: TRADING.rate_limit_prune_at,
        }
    }

    pub fn with_prune_threshold(mut self, prune_at: usize) -> Self {
        self.prune_at = prune_at;
        self
    }

    /// Ok when the user may proceed (and the attempt is recorded), else Err(retry_after_ms).
    pub async fn check(&self, user_id: &str) -> Result<(), i64> {
        let mut guard = self.inner.lock().await;
        let now = self.clock.now_ms();

        // 1. Still inside the window of the last accepted attempt?
        if let Some(&last) = guard.last_attempt.get(user_id) {
            let elapsed = now - last;
            if elapsed < guard.window_ms {
                return Err(guard.window_ms - elapsed);
            }
        }

        // 2. Record, sweeping stale users once the map grows
        guard.last_attempt.insert(user_id.to_string(), now);
        if guard.last_attempt.len() > self.prune_at {
            guard.prune_expired(now);
        }
        Ok(())
    }

    /// Forget users whose window has long passed
    pub async fn prune(&self) -> usize {
        let now = self.clock.now_ms();
        self.inner.lock().await.prune_expired(now)
    }

    pub async fn tracked_users(&self) -> usize {
        self.inner.lock().await.last_attempt.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    #[tokio::test]
    async fn second_attempt_inside_window_is_rejected() {
        let clock = Arc::new(ManualClock::new(1_000));
        let limiter = TradeRateLimiter::new(Duration::from_secs(5), clock.clone());

        assert_eq!(limiter.check("alice").await, Ok(()));
        clock.advance_ms(1_500);
        assert_eq!(limiter.check("alice").await, Err(3_500));
        // Other users have their own window
        assert_eq!(limiter.check("bob").await, Ok(()));

        clock.advance_ms(3_500);
        assert_eq!(limiter.check("alice").await, Ok(()));
    }

    #[tokio::test]
    async fn rejected_attempts_do_not_extend_the_window() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = TradeRateLimiter::new(Duration::from_secs(5), clock.clone());

        limiter.check("u").await.unwrap();
        clock.advance_ms(4_000);
        assert!(limiter.check("u").await.is_err());
        clock.advance_ms(1_000);
        assert!(limiter.check("u").await.is_ok());
    }

    #[tokio::test]
    async fn prune_drops_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = TradeRateLimiter::new(Duration::from_secs(5), clock.clone());
        limiter.check("a").await.unwrap();
        clock.advance_ms(2_000);
        limiter.check("b").await.unwrap();
        clock.advance_ms(3_000);

        assert_eq!(limiter.prune().await, 1);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("b").await.is_err());
    }

    #[tokio::test]
    async fn check_sweeps_expired_users_past_the_threshold() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter =
            TradeRateLimiter::new(Duration::from_secs(5), clock.clone()).with_prune_threshold(3);

        for user in ["a", "b", "c"] {
            limiter.check(user).await.unwrap();
        }
        assert_eq!(limiter.tracked_users().await, 3);

        clock.advance_ms(6_000);
        limiter.check("d").await.unwrap();
        // a, b and c expired; only d remains
        assert_eq!(limiter.tracked_users().await, 1);
        assert!(limiter.check("d").await.is_err());
    }
}
