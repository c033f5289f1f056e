// 用量存储
// 只追加写入 usage_metrics 表，统计在 SQL 中聚合

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::database::UsageStore;
use crate::database::models::usage::{DailyCount, UsageEvent, UsageGroup, UsageTotals};
use crate::error::StoreError;

pub struct UsageOperation {
    db: Arc<PgPool>,
}

impl UsageOperation {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageStore for UsageOperation {
    async fn append(&self, event: &UsageEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO usage_metrics
                (id, user_id, model, prompt_tokens, completion_tokens,
                 total_tokens, response_time_ms, endpoint, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&event.id)
        .bind(&event.user_id)
        .bind(&event.model)
        .bind(event.prompt_tokens)
        .bind(event.completion_tokens)
        .bind(event.total_tokens)
        .bind(event.response_time_ms)
        .bind(&event.endpoint)
        .bind(event.created_at)
        .execute(&*self.db)
        .await?;

        Ok(())
    }

    async fn totals_since(&self, since: DateTime<Utc>) -> Result<UsageTotals, StoreError> {
        let totals = sqlx::query_as::<_, UsageTotals>(
            r#"
            SELECT COUNT(*) AS requests,
                   COUNT(DISTINCT user_id) AS active_users,
                   COALESCE(ROUND(AVG(response_time_ms)), 0)::BIGINT AS avg_response_time
            FROM usage_metrics
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&*self.db)
        .await?;

        Ok(totals)
    }

    async fn by_user_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
        let groups = sqlx::query_as::<_, UsageGroup>(
            r#"
            SELECT user_id AS key,
                   COUNT(*) AS requests,
                   SUM(prompt_tokens)::BIGINT AS prompt_tokens,
                   SUM(completion_tokens)::BIGINT AS completion_tokens,
                   SUM(total_tokens)::BIGINT AS total_tokens,
                   ROUND(AVG(response_time_ms))::BIGINT AS avg_response_time
            FROM usage_metrics
            WHERE created_at >= $1
            GROUP BY user_id
            ORDER BY requests DESC, user_id ASC
            "#,
        )
        .bind(since)
        .fetch_all(&*self.db)
        .await?;

        Ok(groups)
    }

    async fn by_model_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageGroup>, StoreError> {
        let groups = sqlx::query_as::<_, UsageGroup>(
            r#"
            SELECT model AS key,
                   COUNT(*) AS requests,
                   SUM(prompt_tokens)::BIGINT AS prompt_tokens,
                   SUM(completion_tokens)::BIGINT AS completion_tokens,
                   SUM(total_tokens)::BIGINT AS total_tokens,
                   ROUND(AVG(response_time_ms))::BIGINT AS avg_response_time
            FROM usage_metrics
            WHERE created_at >= $1
            GROUP BY model
            ORDER BY requests DESC, model ASC
            "#,
        )
        .bind(since)
        .fetch_all(&*self.db)
        .await?;

        Ok(groups)
    }

    async fn daily_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let days = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day,
                   COUNT(*) AS requests
            FROM usage_metrics
            WHERE created_at >= $1
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(since)
        .fetch_all(&*self.db)
        .await?;

        Ok(days)
    }
}
