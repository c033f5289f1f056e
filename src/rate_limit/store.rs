use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::model::{ConsumeOutcome, RateLimitCounter};
use crate::error::StoreError;

/// 计数器存储，多个实例共享
///
/// `consume` must run lookup, window reset, limit check and increment as one
/// atomic step per key.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn consume(
        &self,
        key: &str,
        now: i64,
        limit: u32,
        window_ms: u64,
    ) -> Result<ConsumeOutcome, StoreError>;
}

/// 进程内计数器，用于测试和单实例开发环境
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, RateLimitCounter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<RateLimitCounter> {
        self.counters.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn consume(
        &self,
        key: &str,
        now: i64,
        limit: u32,
        window_ms: u64,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(key.to_string())
            .or_insert_with(|| RateLimitCounter::new(key, now, window_ms));
        Ok(counter.consume(now, limit, window_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_counter_lazily() {
        let store = MemoryCounterStore::new();
        assert!(store.get("k").await.is_none());

        let outcome = store.consume("k", 100, 3, 1000).await.unwrap();
        assert!(outcome.admitted);
        assert_eq!(outcome.count_before, 0);
        assert_eq!(outcome.reset_at, 1100);

        let counter = store.get("k").await.unwrap();
        assert_eq!(counter.count, 1);
        assert_eq!(counter.reset_at, 1100);
    }
}
