// 数据库模块
// 包含数据库实体定义、存储接口和实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub mod memory; // 内存实现
pub mod models; // 数据库实体定义
pub mod operations; // Postgres 实现

pub use memory::{MemoryApiKeyStore, MemoryUsageStore};
pub use models::api_key::ApiKeyEntity;
pub use models::usage::{DailyCount, UsageEvent, UsageEventInput, UsageGroup, UsageTotals};
pub use operations::{ApiKeyOperation, UsageOperation};

/// 用量记录存储，只追加
///
/// The `*_since` queries aggregate inside the store and cover records created
/// at or after `since`. Groups come back ordered by request count descending,
/// then by key.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, event: &UsageEvent) -> Result<(), StoreError>;

    async fn totals_since(&self, since: DateTime<Utc>) -> Result<UsageTotals, StoreError>;

    async fn by_user_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError>;

    async fn by_model_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError>;

    /// 按 UTC 日期统计请求数，没有记录的日期不返回
    async fn daily_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, StoreError>;
}

/// API 密钥存储
///
/// Mutations take the owning `user_id` so a caller can only touch its own keys.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKeyEntity>, StoreError>;

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyEntity>, StoreError>;

    async fn insert(&self, entity: &ApiKeyEntity) -> Result<(), StoreError>;

    async fn set_active(
        &self,
        id: &str,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<ApiKeyEntity>, StoreError>;

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, StoreError>;
}
