use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::database::{UsageEvent, UsageEventInput, UsageStore};

/// 用量记录器，尽力而为
///
/// Persistence failures are logged and dropped; they never reach the caller.
#[derive(Clone)]
pub struct UsageTracker {
    store: Arc<dyn UsageStore>,
}

impl UsageTracker {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, input: UsageEventInput) {
        let event = UsageEvent::from_input(input, Utc::now());

        if let Err(e) = self.store.append(&event).await {
            tracing::error!(
                "Failed to track usage for user {} on {}: {}",
                event.user_id,
                event.endpoint,
                e
            );
        }
    }

    /// Records on a detached task so the response is not held up by the store.
    pub fn spawn_record(&self, input: UsageEventInput) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move { tracker.record(input).await })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::database::{DailyCount, MemoryUsageStore, UsageGroup, UsageTotals};
    use crate::error::StoreError;

    struct BrokenStore;

    #[async_trait]
    impl UsageStore for BrokenStore {
        async fn append(&self, _event: &UsageEvent) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn totals_since(&self, _since: DateTime<Utc>) -> Result<UsageTotals, StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn by_user_since(&self, _since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn by_model_since(&self, _since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn daily_counts_since(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Vec<DailyCount>, StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    fn input() -> UsageEventInput {
        UsageEventInput {
            user_id: "user-1".into(),
            model: "llama3.2:3b".into(),
            response_time_ms: 120,
            endpoint: "/api/v1/chat/completions".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn total_is_sum_of_prompt_and_completion() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = UsageTracker::new(store.clone());

        tracker
            .record(UsageEventInput {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                ..input()
            })
            .await;

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.prompt_tokens, 10);
        assert_eq!(event.completion_tokens, 5);
        assert_eq!(event.total_tokens, 15);
        assert_eq!(event.response_time_ms, 120);
        assert_eq!(event.user_id, "user-1");
        assert_eq!(event.endpoint, "/api/v1/chat/completions");
    }

    #[tokio::test]
    async fn omitted_token_counts_default_to_zero() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = UsageTracker::new(store.clone());

        tracker.record(input()).await;

        let event = &store.events().await[0];
        assert_eq!(
            (event.prompt_tokens, event.completion_tokens, event.total_tokens),
            (0, 0, 0)
        );
    }

    #[tokio::test]
    async fn store_errors_are_swallowed() {
        let tracker = UsageTracker::new(Arc::new(BrokenStore));
        tracker.record(input()).await;
        tracker.spawn_record(input()).await.unwrap();
    }

    #[tokio::test]
    async fn spawned_record_lands_in_store() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = UsageTracker::new(store.clone());

        tracker.spawn_record(input()).await.unwrap();

        assert_eq!(store.events().await.len(), 1);
    }
}
