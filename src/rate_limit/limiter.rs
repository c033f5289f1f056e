use std::sync::Arc;

use super::model::RateLimitDecision;
use super::store::CounterStore;
use crate::config::Config;

/// 固定窗口限流器
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u32,
    window_ms: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, limit: u32, window_ms: u64) -> Self {
        Self {
            store,
            limit,
            window_ms,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, config: &Config) -> Self {
        Self::new(store, config.rate_limit_requests, config.rate_limit_window_ms)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn check_and_consume(&self, key: &str) -> RateLimitDecision {
        self.check_and_consume_at(key, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// `now` is unix milliseconds.
    ///
    /// Store failures never block a request: the decision falls back to
    /// `FailOpen` with the full limit as remaining.
    pub async fn check_and_consume_at(&self, key: &str, now: i64) -> RateLimitDecision {
        match self
            .store
            .consume(key, now, self.limit, self.window_ms)
            .await
        {
            Ok(outcome) if outcome.admitted => RateLimitDecision::Allowed {
                remaining: self.limit.saturating_sub(outcome.count_before + 1),
            },
            Ok(outcome) => {
                tracing::debug!(
                    "Rate limit exceeded, window resets at {}",
                    outcome.reset_at
                );
                RateLimitDecision::Denied
            }
            Err(e) => {
                tracing::warn!("Rate limit store error, allowing request: {}", e);
                RateLimitDecision::FailOpen {
                    remaining: self.limit,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreError;
    use crate::rate_limit::model::ConsumeOutcome;
    use crate::rate_limit::store::MemoryCounterStore;

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn consume(
            &self,
            _key: &str,
            _now: i64,
            _limit: u32,
            _window_ms: u64,
        ) -> Result<ConsumeOutcome, StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    // 可随时切换为不可用的存储
    #[derive(Default)]
    struct SwitchableStore {
        inner: MemoryCounterStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl CounterStore for SwitchableStore {
        async fn consume(
            &self,
            key: &str,
            now: i64,
            limit: u32,
            window_ms: u64,
        ) -> Result<ConsumeOutcome, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable);
            }
            self.inner.consume(key, now, limit, window_ms).await
        }
    }

    fn limiter(limit: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()), limit, window_ms)
    }

    #[tokio::test]
    async fn fresh_key_counts_down_then_denies() {
        let limiter = limiter(5, 60_000);
        for expected in (0..5).rev() {
            let decision = limiter.check_and_consume_at("key", 0).await;
            assert_eq!(decision, RateLimitDecision::Allowed { remaining: expected });
        }
        let decision = limiter.check_and_consume_at("key", 0).await;
        assert_eq!(decision, RateLimitDecision::Denied);
        assert!(!decision.allowed());
        assert_eq!(decision.remaining(), 0);
    }

    #[tokio::test]
    async fn window_scenario() {
        let limiter = limiter(3, 1000);
        let calls = [
            (0, RateLimitDecision::Allowed { remaining: 2 }),
            (1, RateLimitDecision::Allowed { remaining: 1 }),
            (2, RateLimitDecision::Allowed { remaining: 0 }),
            (3, RateLimitDecision::Denied),
            (1001, RateLimitDecision::Allowed { remaining: 2 }),
        ];
        for (now, expected) in calls {
            assert_eq!(limiter.check_and_consume_at("k1", now).await, expected, "t={}", now);
        }
    }

    #[tokio::test]
    async fn expired_window_behaves_like_fresh_key() {
        let limiter = limiter(2, 1000);
        limiter.check_and_consume_at("k", 0).await;
        limiter.check_and_consume_at("k", 0).await;
        assert_eq!(limiter.check_and_consume_at("k", 500).await, RateLimitDecision::Denied);

        // 窗口在 1000 结束，再过一个窗口长度
        assert_eq!(
            limiter.check_and_consume_at("k", 2000).await,
            RateLimitDecision::Allowed { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.check_and_consume_at("a", 0).await.allowed());
        assert!(!limiter.check_and_consume_at("a", 1).await.allowed());
        assert_eq!(
            limiter.check_and_consume_at("b", 2).await,
            RateLimitDecision::Allowed { remaining: 0 }
        );
    }

    #[tokio::test]
    async fn store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), 100, 60_000);
        for _ in 0..150 {
            assert_eq!(
                limiter.check_and_consume("k").await,
                RateLimitDecision::FailOpen { remaining: 100 }
            );
        }
    }

    #[tokio::test]
    async fn store_failure_fails_open_even_when_exhausted() {
        let store = Arc::new(SwitchableStore::default());
        let limiter = RateLimiter::new(store.clone(), 2, 60_000);
        assert!(limiter.check_and_consume_at("k", 0).await.allowed());
        assert!(limiter.check_and_consume_at("k", 1).await.allowed());
        assert_eq!(limiter.check_and_consume_at("k", 2).await, RateLimitDecision::Denied);

        store.down.store(true, Ordering::SeqCst);
        assert_eq!(
            limiter.check_and_consume_at("k", 3).await,
            RateLimitDecision::FailOpen { remaining: 2 }
        );

        // 恢复后计数不变，仍在同一窗口内
        store.down.store(false, Ordering::SeqCst);
        assert_eq!(limiter.check_and_consume_at("k", 4).await, RateLimitDecision::Denied);
    }

    #[tokio::test]
    async fn concurrent_requests_never_overshoot() {
        let limiter = limiter(10, 60_000);
        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_and_consume_at("shared", 0).await.allowed()
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }
}
