// 内存存储
// 与 Postgres 存储行为一致，用于测试

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::api_key::ApiKeyEntity;
use super::models::usage::{DailyCount, UsageEvent, UsageGroup, UsageTotals};
use super::{ApiKeyStore, UsageStore};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryUsageStore {
    events: RwLock<Vec<UsageEvent>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<UsageEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn append(&self, event: &UsageEvent) -> Result<(), StoreError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn totals_since(&self, since: DateTime<Utc>) -> Result<UsageTotals, StoreError> {
        let events = self.events.read().await;
        let in_range: Vec<&UsageEvent> = since_filter(&events, since).collect();
        let users: HashSet<&str> = in_range.iter().map(|e| e.user_id.as_str()).collect();
        let elapsed: i64 = in_range.iter().map(|e| e.response_time_ms).sum();

        Ok(UsageTotals {
            requests: in_range.len() as i64,
            active_users: users.len() as i64,
            avg_response_time: rounded_avg(elapsed, in_range.len()),
        })
    }

    async fn by_user_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
        let events = self.events.read().await;
        Ok(group_by(since_filter(&events, since), |e| e.user_id.as_str()))
    }

    async fn by_model_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
        let events = self.events.read().await;
        Ok(group_by(since_filter(&events, since), |e| e.model.as_str()))
    }

    async fn daily_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let events = self.events.read().await;
        let mut days = BTreeMap::new();
        for event in since_filter(&events, since) {
            *days.entry(event.created_at.date_naive()).or_insert(0i64) += 1;
        }
        Ok(days
            .into_iter()
            .map(|(day, requests)| DailyCount { day, requests })
            .collect())
    }
}

fn since_filter(
    events: &[UsageEvent],
    since: DateTime<Utc>,
) -> impl Iterator<Item = &UsageEvent> {
    events.iter().filter(move |e| e.created_at >= since)
}

// 与 SQL 的 ROUND(AVG(..)) 一致：四舍五入，远离零
fn rounded_avg(sum: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i64
}

fn group_by<'a>(
    events: impl Iterator<Item = &'a UsageEvent>,
    key: impl Fn(&UsageEvent) -> &str,
) -> Vec<UsageGroup> {
    let mut groups: HashMap<String, (UsageGroup, i64)> = HashMap::new();
    for event in events {
        let (group, elapsed) = groups.entry(key(event).to_string()).or_insert_with(|| {
            let group = UsageGroup {
                key: key(event).to_string(),
                requests: 0,
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
                avg_response_time: 0,
            };
            (group, 0)
        });
        group.requests += 1;
        group.prompt_tokens += event.prompt_tokens;
        group.completion_tokens += event.completion_tokens;
        group.total_tokens += event.total_tokens;
        *elapsed += event.response_time_ms;
    }

    let mut groups: Vec<UsageGroup> = groups
        .into_values()
        .map(|(mut group, elapsed)| {
            group.avg_response_time = rounded_avg(elapsed, group.requests as usize);
            group
        })
        .collect();
    groups.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.key.cmp(&b.key)));
    groups
}

#[derive(Default)]
pub struct MemoryApiKeyStore {
    keys: RwLock<Vec<ApiKeyEntity>>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKeyEntity>, StoreError> {
        let keys = self.keys.read().await;
        Ok(keys.iter().find(|k| k.key == key).cloned())
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        if let Some(entity) = keys.iter_mut().find(|k| k.id == id) {
            entity.last_used = Some(at);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyEntity>, StoreError> {
        let keys = self.keys.read().await;
        let mut owned: Vec<ApiKeyEntity> = keys
            .iter()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert(&self, entity: &ApiKeyEntity) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        if keys.iter().any(|k| k.key == entity.key) {
            return Err(StoreError::Corrupt(format!("duplicate api key {}", entity.id)));
        }
        keys.push(entity.clone());
        Ok(())
    }

    async fn set_active(
        &self,
        id: &str,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<ApiKeyEntity>, StoreError> {
        let mut keys = self.keys.write().await;
        Ok(keys
            .iter_mut()
            .find(|k| k.id == id && k.user_id == user_id)
            .map(|entity| {
                entity.is_active = is_active;
                entity.clone()
            }))
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k| !(k.id == id && k.user_id == user_id));
        Ok(keys.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_are_scoped_to_owner() {
        let store = MemoryApiKeyStore::new();
        let mine = ApiKeyEntity::new("alice", Some("laptop".into()));
        store.insert(&mine).await.unwrap();

        assert!(store.set_active(&mine.id, "bob", false).await.unwrap().is_none());
        assert!(!store.delete(&mine.id, "bob").await.unwrap());

        let updated = store.set_active(&mine.id, "alice", false).await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(store.delete(&mine.id, "alice").await.unwrap());
        assert!(store.find_by_key(&mine.key).await.unwrap().is_none());
    }
}
